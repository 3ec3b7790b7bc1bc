/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BotCommand {
    /// Liveness check; replies "PONG" without touching any credential.
    Ping,
    /// List the first courses the user has access to.
    Courses,
    /// List coursework for one course.
    CourseWork { course_id: String },
    /// Show usage for the other commands.
    Help,
}

pub(crate) const HELP_TEXT: &str = "/courses — list the first 10 courses with their IDs.\n\
/work <course id> — list the first 10 coursework items for that course.";

pub(crate) fn parse_command(text: &str) -> Option<BotCommand> {
    let trimmed = text.trim();

    if command_matches(trimmed, "/ping") {
        return Some(BotCommand::Ping);
    }
    if command_matches(trimmed, "/courses") {
        return Some(BotCommand::Courses);
    }
    if command_matches(trimmed, "/help") {
        return Some(BotCommand::Help);
    }
    if let Some(rest) = strip_command(trimmed, "/work") {
        let mut args = rest.split_whitespace();
        let course_id = args.next()?.to_string();
        if args.next().is_some() {
            return None;
        }
        return Some(BotCommand::CourseWork { course_id });
    }

    None
}

/// Exact command match, allowing a `@botname` mention suffix.
fn command_matches(trimmed_text: &str, command: &str) -> bool {
    if trimmed_text == command {
        return true;
    }

    trimmed_text
        .strip_prefix(command)
        .is_some_and(|stripped| stripped.starts_with('@'))
}

/// Strips a command prefix (with an optional `@botname` mention) and returns
/// the argument remainder, or None when the text is not that command at all.
fn strip_command<'a>(trimmed_text: &'a str, command: &str) -> Option<&'a str> {
    let rest = trimmed_text.strip_prefix(command)?;
    if rest.is_empty() {
        return Some(rest);
    }
    if rest.starts_with('@') {
        return match rest.split_once(' ') {
            Some((_mention, args)) => Some(args),
            None => Some(""),
        };
    }
    if rest.starts_with(' ') {
        return Some(rest.trim_start());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{BotCommand, command_matches, parse_command};

    #[test]
    fn parse_courses_and_help_commands() {
        assert_eq!(parse_command("/courses"), Some(BotCommand::Courses));
        assert_eq!(parse_command(" /courses@classbot "), Some(BotCommand::Courses));
        assert_eq!(parse_command("/help"), Some(BotCommand::Help));
        assert_eq!(parse_command("/help@classbot"), Some(BotCommand::Help));
    }

    #[test]
    fn parse_ping_command() {
        assert_eq!(parse_command("/ping"), Some(BotCommand::Ping));
        assert_eq!(parse_command(" /ping@classbot "), Some(BotCommand::Ping));
        assert_eq!(parse_command("/ping me"), None);
        assert_eq!(parse_command("/pingx"), None);
    }

    #[test]
    fn parse_work_command_with_course_id() {
        assert_eq!(
            parse_command("/work 616373616787"),
            Some(BotCommand::CourseWork {
                course_id: "616373616787".to_string()
            })
        );
        assert_eq!(
            parse_command("/work@classbot abc"),
            Some(BotCommand::CourseWork {
                course_id: "abc".to_string()
            })
        );
    }

    #[test]
    fn rejects_non_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/courses please"), None);
        assert_eq!(parse_command("/coursesx"), None);
        assert_eq!(parse_command("/work"), None);
        assert_eq!(parse_command("/work@classbot"), None);
        assert_eq!(parse_command("/work a b"), None);
    }

    #[test]
    fn command_matcher_accepts_bot_mentions_only() {
        assert!(command_matches("/courses", "/courses"));
        assert!(command_matches("/courses@classbot", "/courses"));
        assert!(!command_matches("/courses anything", "/courses"));
    }
}
