//! /status command - show conversation and paging state

use super::CommandResult;
use scrollback_core::ChatSnapshot;

pub struct StatusCommand;

impl StatusCommand {
    pub fn execute(snapshot: &ChatSnapshot) -> CommandResult {
        let mut output = String::from("Conversation Status\n");
        output.push_str(&"-".repeat(40));
        output.push('\n');

        let conversation = if snapshot.conversation_id.is_empty() {
            "(new)"
        } else {
            snapshot.conversation_id.as_str()
        };
        output.push_str(&format!("Conversation: {}\n", conversation));

        let questions = snapshot.items.iter().filter(|i| !i.is_answer).count();
        output.push_str(&format!(
            "Messages:     {} held ({} questions)\n",
            snapshot.items.len(),
            questions
        ));
        output.push_str(&format!("Older pages:  {}\n", yes_no(snapshot.has_more)));
        output.push_str(&format!("Loading:      {}\n", yes_no(snapshot.is_loading_more)));
        output.push_str(&format!("Retries:      {}\n", snapshot.retry_count));
        output.push_str(&format!("Responding:   {}", yes_no(snapshot.is_responding)));
        if let Some(ref id) = snapshot.message_id {
            output.push_str(&format!("\nLast answer:  {}", id));
        }

        CommandResult::Message(output)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
