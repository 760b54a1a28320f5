//! /history command - list the messages held

use super::CommandResult;
use crate::utils::format_item;
use scrollback_core::ChatSnapshot;

const DEFAULT_COUNT: usize = 20;
const PREVIEW_CHARS: usize = 120;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn execute(args: &str, snapshot: &ChatSnapshot) -> CommandResult {
        let count = match args {
            "" => DEFAULT_COUNT,
            "all" => usize::MAX,
            n => match n.parse::<usize>() {
                Ok(n) => n,
                Err(_) => {
                    return CommandResult::Message(format!(
                        "Invalid count: '{}'\nUsage: /history [count|all]",
                        args
                    ));
                }
            },
        };

        if snapshot.items.is_empty() {
            return CommandResult::Message("No messages loaded.".to_string());
        }

        let skip = snapshot.items.len().saturating_sub(count);
        let mut output = String::new();
        if skip > 0 {
            output.push_str(&format!("({} earlier messages not shown)\n", skip));
        }
        for (i, item) in snapshot.items.iter().enumerate().skip(skip) {
            output.push_str(&format!("{:>4} {}\n", i, format_item(item, PREVIEW_CHARS)));
        }
        if snapshot.has_more {
            output.push_str("(older messages available: /more)");
        } else {
            output.push_str("(beginning of conversation)");
        }

        CommandResult::Message(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollback_client::ChatItem;

    fn snapshot(n: usize) -> ChatSnapshot {
        ChatSnapshot {
            items: (0..n)
                .map(|i| ChatItem::answer(format!("a{}", i), format!("answer {}", i)))
                .collect(),
            has_more: true,
            ..ChatSnapshot::default()
        }
    }

    #[test]
    fn test_shows_latest_items() {
        let CommandResult::Message(text) = HistoryCommand::execute("2", &snapshot(5)) else {
            panic!("expected message");
        };
        assert!(text.starts_with("(3 earlier messages not shown)"));
        assert!(text.contains("answer 4"));
        assert!(!text.contains("answer 2"));
        assert!(text.ends_with("(older messages available: /more)"));
    }

    #[test]
    fn test_all_and_invalid_counts() {
        let CommandResult::Message(text) = HistoryCommand::execute("all", &snapshot(3)) else {
            panic!("expected message");
        };
        assert!(text.contains("answer 0"));

        let CommandResult::Message(text) = HistoryCommand::execute("lots", &snapshot(3)) else {
            panic!("expected message");
        };
        assert!(text.starts_with("Invalid count"));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(
            HistoryCommand::execute("", &ChatSnapshot::default()),
            CommandResult::Message("No messages loaded.".into())
        );
    }
}
