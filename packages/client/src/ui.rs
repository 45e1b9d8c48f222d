//! UI utilities for the client.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

/// Prompt shared between the readline thread and the frame printer
#[derive(Debug, Clone)]
pub struct Prompt(Arc<Mutex<String>>);

impl Prompt {
    pub fn new(initial: String) -> Self {
        Self(Arc::new(Mutex::new(initial)))
    }

    pub fn get(&self) -> String {
        self.0.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn set(&self, prompt: String) {
        if let Ok(mut current) = self.0.lock() {
            *current = prompt;
        }
    }

    /// Redisplay the prompt after printing a frame
    pub fn redisplay(&self) {
        print!("{}", self.get());
        std::io::stdout().flush().ok();
    }
}
