//! Terminal renderings of the chat transcript and the completion output.

use crate::chat::{ChatView, Message, Role};
use crate::completion::CompletionView;
use std::io::Write;

/// Prints bot replies to stdout as fragments arrive.
///
/// User messages are not echoed: the terminal already shows what was typed.
#[derive(Debug, Default)]
pub struct TerminalChat {
    /// Whether the cursor sits after a partially printed bot reply.
    mid_reply: bool,
}

impl TerminalChat {
    /// End the current reply line, if one is open.
    pub fn finish_reply(&mut self) {
        if self.mid_reply {
            println!();
            self.mid_reply = false;
        }
    }
}

impl ChatView for TerminalChat {
    fn message_appended(&mut self, _index: usize, message: &Message) {
        if message.role == Role::Bot {
            print!("bot: {}", message.text);
            self.mid_reply = true;
        }
    }

    fn message_extended(&mut self, _index: usize, fragment: &str) {
        print!("{fragment}");
    }

    fn message_replaced(&mut self, _index: usize, message: &Message) {
        // Whatever streamed before the failure stays on screen; start fresh.
        println!();
        print!("bot: {}", message.text);
        self.mid_reply = true;
    }

    fn scroll_to_latest(&mut self) {
        let _ = std::io::stdout().flush();
    }

    fn control_changed(&mut self, enabled: bool) {
        if enabled {
            self.finish_reply();
        }
    }
}

/// Prints each output update on its own line.
#[derive(Debug, Default)]
pub struct TerminalCompletion;

impl CompletionView for TerminalCompletion {
    fn output_changed(&mut self, text: &str) {
        println!("{text}");
    }
}
