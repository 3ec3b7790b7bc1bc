use anyhow::Result;
use classbot_core::auth::{self, LocalConsentFlow};
use classbot_core::classroom::{Course, CourseWork, DEFAULT_PAGE_SIZE};
use classbot_core::error::Error;

use crate::bot::context::BotContext;
use crate::commands::{BotCommand, HELP_TEXT, parse_command};
use crate::telegram::Message;

pub(crate) async fn handle_message(context: &BotContext, message: Message) -> Result<()> {
    if !message.chat.is_private() {
        tracing::debug!("Ignoring non-DM chat {}", message.chat.id);
        return Ok(());
    }

    let chat_id = message.chat.id;
    let reply_to = Some(message.message_id);

    let Some(user) = message.from.as_ref() else {
        tracing::debug!("Ignoring message without sender in chat {chat_id}");
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    if !context.allowlist_user_ids().contains(&user.id) {
        tracing::info!("Denied user {} for chat {}", user.id, chat_id);
        let _ = context
            .client()
            .send_message(chat_id, "Access denied.", reply_to)
            .await;
        return Ok(());
    }

    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let Some(command) = parse_command(text) else {
        tracing::debug!("Ignoring non-command message in chat {chat_id}");
        return Ok(());
    };

    tracing::info!(
        "Accepted {:?} from user {} in chat {}",
        command,
        user.id,
        chat_id
    );

    let reply = match run_command(context, &command).await {
        Ok(reply) => reply,
        Err(err) => {
            tracing::error!("Command error: {err}");
            "Sorry, something went wrong.".to_string()
        }
    };

    context.client().send_message(chat_id, &reply, reply_to).await?;
    Ok(())
}

async fn run_command(
    context: &BotContext,
    command: &BotCommand,
) -> std::result::Result<String, Error> {
    match command {
        BotCommand::Ping => Ok("PONG".to_string()),
        BotCommand::Help => Ok(HELP_TEXT.to_string()),
        BotCommand::Courses => {
            let mut authorizer = auth::acquire(context.auth_config(), &LocalConsentFlow).await?;
            let courses = context
                .classroom()
                .list_courses(&mut authorizer, DEFAULT_PAGE_SIZE)
                .await?;
            Ok(format_courses(&courses))
        }
        BotCommand::CourseWork { course_id } => {
            let mut authorizer = auth::acquire(context.auth_config(), &LocalConsentFlow).await?;
            let work = context
                .classroom()
                .list_course_work(&mut authorizer, course_id, DEFAULT_PAGE_SIZE)
                .await?;
            Ok(format_course_work(&work))
        }
    }
}

fn format_courses(courses: &[Course]) -> String {
    if courses.is_empty() {
        return "No courses found.".to_string();
    }

    courses
        .iter()
        .enumerate()
        .map(|(i, course)| format!("{}. {} ({})", i + 1, course.name, course.id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_course_work(work: &[CourseWork]) -> String {
    if work.is_empty() {
        return "No coursework found.".to_string();
    }

    work.iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {} ({})", i + 1, item.title, item.id))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use classbot_core::classroom::{ClassroomClient, Course, CourseWork};
    use classbot_core::config::AuthConfig;

    use super::{BotCommand, BotContext, format_course_work, format_courses, run_command};
    use crate::telegram::TelegramClient;

    #[tokio::test]
    async fn ping_replies_pong_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let context = BotContext::new(
            TelegramClient::new("unused".to_string()),
            AuthConfig {
                token_path: dir.path().join("token.json"),
                client_secrets_path: dir.path().join("credentials.json"),
            },
            ClassroomClient::new(),
            HashSet::from([1]),
        );

        let reply = run_command(&context, &BotCommand::Ping).await.unwrap();
        assert_eq!(reply, "PONG");
        assert!(!dir.path().join("token.json").exists());
    }

    #[test]
    fn zero_courses_is_a_message_not_an_error() {
        assert_eq!(format_courses(&[]), "No courses found.");
    }

    #[test]
    fn courses_are_numbered_with_ids() {
        let courses = vec![
            Course {
                id: "616373616787".to_string(),
                name: "Math".to_string(),
                section: None,
            },
            Course {
                id: "2".to_string(),
                name: "History".to_string(),
                section: Some("B".to_string()),
            },
        ];

        assert_eq!(
            format_courses(&courses),
            "1. Math (616373616787)\n2. History (2)"
        );
    }

    #[test]
    fn coursework_formatting() {
        assert_eq!(format_course_work(&[]), "No coursework found.");

        let work = vec![CourseWork {
            id: "w1".to_string(),
            title: "Homework 1".to_string(),
        }];
        assert_eq!(format_course_work(&work), "1. Homework 1 (w1)");
    }
}
