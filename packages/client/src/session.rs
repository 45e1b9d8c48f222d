//! WebSocket client session management.

use futures_util::{SinkExt, StreamExt};
use hanashi_server::infrastructure::dto::websocket::{ClientEnvelope, ServerFrame};
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{Message, frame::coding::CloseCode},
};

use super::{error::ClientError, formatter::MessageFormatter, ui::Prompt};

/// Run one WebSocket client session
///
/// Returns `Ok(())` when the input side ends (Ctrl+C / Ctrl+D), and an error when
/// the connection is lost or the server rejects the token.
pub async fn run_client_session(
    url: &str,
    token: &str,
    input_rx: &mut mpsc::UnboundedReceiver<ClientEnvelope>,
    prompt: &Prompt,
) -> Result<(), ClientError> {
    let url = format!("{}?token={}", url, token);

    let (ws_stream, _response) = connect_async(&url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to messaging server!");
    println!(
        "\nType /to <user> to pick a recipient, @<user> <message> to send once, /help for help. Press Ctrl+C to exit.\n"
    );
    prompt.redisplay();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerFrame>(text.as_str()) {
                        Ok(frame) => print!("{}", MessageFormatter::format_frame(&frame)),
                        Err(_) => print!("{}", MessageFormatter::format_raw_message(text.as_str())),
                    }
                    prompt.redisplay();
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(match frame {
                        Some(frame) if frame.code == CloseCode::Policy => {
                            ClientError::Unauthenticated(frame.reason.as_str().to_string())
                        }
                        Some(frame) => ClientError::ConnectionError(format!(
                            "server closed the connection ({}: {})",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        )),
                        None => ClientError::ConnectionError(
                            "server closed the connection".to_string(),
                        ),
                    });
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
                None => {
                    return Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
            },
            envelope = input_rx.recv() => match envelope {
                Some(envelope) => {
                    let json = match serde_json::to_string(&envelope) {
                        Ok(json) => json,
                        Err(e) => {
                            tracing::error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = write.send(Message::Text(json.into())).await {
                        tracing::warn!("Failed to send message: {}", e);
                        return Err(ClientError::ConnectionError(e.to_string()));
                    }
                }
                None => {
                    // 入力側が終了した（ユーザーによる終了）
                    write.send(Message::Close(None)).await.ok();
                    return Ok(());
                }
            },
        }
    }
}
