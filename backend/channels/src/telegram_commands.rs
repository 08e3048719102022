//! Telegram Bot Commands
//!
//! Parses `/start`, `/help`, `/wird`, `/settings`, `/pages`, `/time`, `/tz`,
//! `/toggle` and `/city`, and turns them into engine calls.

use tracing::{info, warn};
use wird_core::{
    ChatTarget, CommandSink, FeatureFlag, Location, PreferenceChange, SubscriberId, TimeOfDay,
    WirdError,
};
use wird_media::captions;

const SAVED: &str = "✅ تم الحفظ";
const FAILED: &str = "⚠️ حدث خطأ، حاول لاحقاً";
const INVALID: &str = "⚠️ قيمة غير صالحة";

const USAGE_PAGES: &str = "⚠️ الاستخدام: /pages 2";
const USAGE_TIME: &str = "⚠️ الاستخدام: /time 21:30";
const USAGE_TZ: &str = "⚠️ الاستخدام: /tz 3";
const USAGE_TOGGLE: &str =
    "⚠️ الاستخدام: /toggle baqarah|morning\\_azkar|evening\\_azkar|kahf|mulk|white\\_days on|off";
const USAGE_CITY: &str = "⚠️ الاستخدام: /city Cairo, Egypt";

#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    Start,
    Help,
    Wird,
    Settings,
    Pages(u32),
    Time(TimeOfDay),
    Tz(i32),
    Toggle(FeatureFlag, bool),
    /// `None` clears the location back to the default group.
    City(Option<Location>),
}

/// `None` when the text is not one of our commands; `Err` carries the usage
/// reply for a known command with bad arguments.
pub fn parse_command(text: &str) -> Option<Result<BotCommand, String>> {
    let text = text.trim();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };
    // "/pages@WirdBot 3" in groups
    let name = head.split('@').next().unwrap_or(head).to_ascii_lowercase();

    let parsed = match name.as_str() {
        "start" => Ok(BotCommand::Start),
        "help" => Ok(BotCommand::Help),
        "wird" => Ok(BotCommand::Wird),
        "settings" => Ok(BotCommand::Settings),
        "pages" => args
            .parse::<u32>()
            .map(BotCommand::Pages)
            .map_err(|_| USAGE_PAGES.to_string()),
        "time" => args
            .parse::<TimeOfDay>()
            .map(BotCommand::Time)
            .map_err(|_| USAGE_TIME.to_string()),
        "tz" => args
            .trim_start_matches('+')
            .parse::<i32>()
            .map(BotCommand::Tz)
            .map_err(|_| USAGE_TZ.to_string()),
        "toggle" => parse_toggle(args).ok_or_else(|| USAGE_TOGGLE.to_string()),
        "city" => parse_city(args).ok_or_else(|| USAGE_CITY.to_string()),
        _ => return None,
    };
    Some(parsed)
}

fn parse_toggle(args: &str) -> Option<BotCommand> {
    let mut parts = args.split_whitespace();
    let flag = FeatureFlag::parse(parts.next()?)?;
    let on = match parts.next()?.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => true,
        "off" | "0" | "false" => false,
        _ => return None,
    };
    parts.next().is_none().then_some(BotCommand::Toggle(flag, on))
}

fn parse_city(args: &str) -> Option<BotCommand> {
    if args.is_empty() || args.eq_ignore_ascii_case("default") {
        return Some(BotCommand::City(None));
    }
    let (city, country) = args.split_once(',')?;
    let (city, country) = (city.trim(), country.trim());
    if city.is_empty() || country.is_empty() {
        return None;
    }
    Some(BotCommand::City(Some(Location::new(city, country))))
}

/// Where a command came from.
#[derive(Debug, Clone)]
pub struct InboundChat {
    pub subscriber: SubscriberId,
    pub target: ChatTarget,
    pub first_name: Option<String>,
    pub private: bool,
}

pub struct TelegramCommands;

impl TelegramCommands {
    /// Runs one command against the engine and returns the text to reply with.
    /// Failures are logged and answered with a short notice.
    pub async fn execute(
        sink: &dyn CommandSink,
        chat: &InboundChat,
        command: BotCommand,
    ) -> Option<String> {
        info!(subscriber_id = chat.subscriber, command = ?command, "Executing command");

        if let Err(e) = sink.register_subscriber(chat.subscriber, chat.target).await {
            warn!(subscriber_id = chat.subscriber, kind = e.kind(), error = %e, "Registration failed");
            return Some(FAILED.to_string());
        }

        let result = match command {
            BotCommand::Start => return Some(Self::welcome(chat)),
            BotCommand::Help => return Some(captions::HELP.to_string()),
            BotCommand::Wird => sink.send_daily_wird(chat.subscriber).await.map(|_| None),
            BotCommand::Settings => Self::settings(sink, chat.subscriber).await.map(Some),
            BotCommand::Pages(n) => {
                Self::change(sink, chat.subscriber, PreferenceChange::DailyPages(n)).await
            }
            BotCommand::Time(t) => {
                Self::change(sink, chat.subscriber, PreferenceChange::QuranTime(t)).await
            }
            BotCommand::Tz(h) => {
                Self::change(sink, chat.subscriber, PreferenceChange::UtcOffset(h)).await
            }
            BotCommand::Toggle(flag, on) => {
                Self::change(sink, chat.subscriber, PreferenceChange::Flag(flag, on)).await
            }
            BotCommand::City(location) => {
                Self::change(sink, chat.subscriber, PreferenceChange::Location(location)).await
            }
        };

        match result {
            Ok(reply) => reply,
            Err(WirdError::MalformedPreference { field, value }) => {
                info!(subscriber_id = chat.subscriber, field = %field, value = %value, "Rejected preference");
                Some(INVALID.to_string())
            }
            Err(e) => {
                warn!(subscriber_id = chat.subscriber, kind = e.kind(), error = %e, "Command failed");
                Some(FAILED.to_string())
            }
        }
    }

    fn welcome(chat: &InboundChat) -> String {
        if !chat.private {
            return captions::WELCOME_GROUP.to_string();
        }
        // user-controlled text inside a Markdown message
        let name: String = chat
            .first_name
            .as_deref()
            .unwrap_or_default()
            .chars()
            .filter(|c| !matches!(c, '_' | '*' | '`' | '['))
            .collect();
        captions::welcome_private(&name)
    }

    async fn settings(sink: &dyn CommandSink, id: SubscriberId) -> Result<String, WirdError> {
        let preview = sink.get_delivery_preview(id).await?;
        Ok(captions::preview(
            preview.daily_pages,
            preview.current_page,
            &preview.quran_time,
        ))
    }

    async fn change(
        sink: &dyn CommandSink,
        id: SubscriberId,
        change: PreferenceChange,
    ) -> Result<Option<String>, WirdError> {
        sink.on_preference_changed(id, change).await?;
        let settings = Self::settings(sink, id).await?;
        Ok(Some(format!("{SAVED}\n\n{settings}")))
    }
}
