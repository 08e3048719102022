use std::sync::Arc;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberUpdated, InputFile, InputMedia, InputMediaPhoto, ParseMode};
use tracing::{error, info, warn};
use wird_core::{
    ChatTarget, CommandSink, ContentBlob, DeliveryChannel, MediaItem, WirdError, WirdResult,
};
use wird_logging::redact_sensitive_data;
use wird_media::captions;

use crate::telegram_commands::{parse_command, InboundChat, TelegramCommands};

fn upload(blob: &ContentBlob, file_name: &str) -> InputFile {
    InputFile::memory(blob.data.to_vec()).file_name(file_name.to_string())
}

fn delivery_error(target: ChatTarget, err: teloxide::RequestError) -> WirdError {
    WirdError::delivery(target, redact_sensitive_data(&err.to_string()))
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Sends reminders through the Telegram Bot API. Every message goes out with
/// Markdown parse mode; files are uploaded from memory.
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            bot: Bot::new(token),
        }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_text(&self, target: ChatTarget, text: &str) -> WirdResult<()> {
        self.bot
            .send_message(ChatId(target), text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map_err(|e| delivery_error(target, e))?;
        Ok(())
    }

    async fn send_photo(
        &self,
        target: ChatTarget,
        blob: &ContentBlob,
        caption: Option<&str>,
    ) -> WirdResult<()> {
        let mut request = self
            .bot
            .send_photo(ChatId(target), upload(blob, &blob.file_name))
            .parse_mode(ParseMode::Markdown);
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        request.await.map_err(|e| delivery_error(target, e))?;
        Ok(())
    }

    async fn send_document(
        &self,
        target: ChatTarget,
        blob: &ContentBlob,
        filename: &str,
        caption: Option<&str>,
    ) -> WirdResult<()> {
        let mut request = self
            .bot
            .send_document(ChatId(target), upload(blob, filename))
            .parse_mode(ParseMode::Markdown);
        if let Some(caption) = caption {
            request = request.caption(caption);
        }
        request.await.map_err(|e| delivery_error(target, e))?;
        Ok(())
    }

    async fn send_media_group(&self, target: ChatTarget, items: &[MediaItem]) -> WirdResult<()> {
        match items {
            [] => Ok(()),
            // sendMediaGroup rejects fewer than two items
            [single] => {
                self.send_photo(target, &single.blob, single.caption.as_deref())
                    .await
            }
            _ => {
                let media: Vec<InputMedia> = items
                    .iter()
                    .map(|item| {
                        let mut photo = InputMediaPhoto::new(upload(&item.blob, &item.blob.file_name));
                        if let Some(caption) = &item.caption {
                            photo = photo.caption(caption.clone()).parse_mode(ParseMode::Markdown);
                        }
                        InputMedia::Photo(photo)
                    })
                    .collect();
                self.bot
                    .send_media_group(ChatId(target), media)
                    .await
                    .map_err(|e| delivery_error(target, e))?;
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Long-polls Telegram updates and forwards bot commands to the engine.
pub struct TelegramInbound {
    bot: Bot,
    sink: Arc<dyn CommandSink>,
}

impl TelegramInbound {
    pub fn new(channel: &TelegramChannel, sink: Arc<dyn CommandSink>) -> Self {
        Self {
            bot: channel.bot().clone(),
            sink,
        }
    }

    /// Runs until Ctrl-C.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Starting Telegram polling");

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(on_message))
            .branch(Update::filter_my_chat_member().endpoint(on_membership));

        Dispatcher::builder(self.bot, handler)
            .dependencies(dptree::deps![self.sink])
            .enable_ctrlc_handler()
            .build()
            .dispatch()
            .await;

        Ok(())
    }
}

async fn on_message(bot: Bot, msg: Message, sink: Arc<dyn CommandSink>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return respond(());
    };
    let Some(parsed) = parse_command(text) else {
        return respond(());
    };

    let chat = InboundChat {
        subscriber: msg.chat.id.0,
        target: msg.chat.id.0,
        first_name: msg.from.as_ref().map(|u| u.first_name.clone()),
        private: msg.chat.is_private(),
    };
    info!(chat_id = chat.target, command = %text.split_whitespace().next().unwrap_or(""), "Handling Telegram command");

    let reply = match parsed {
        Ok(command) => TelegramCommands::execute(sink.as_ref(), &chat, command).await,
        Err(usage) => Some(usage),
    };
    if let Some(reply) = reply {
        if let Err(e) = bot
            .send_message(msg.chat.id, reply)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            warn!(chat_id = chat.target, error = %redact_sensitive_data(&e.to_string()), "Reply failed");
        }
    }
    respond(())
}

/// The bot was added to (or promoted in) a group or channel: subscribe the chat
/// and greet it.
async fn on_membership(
    bot: Bot,
    update: ChatMemberUpdated,
    sink: Arc<dyn CommandSink>,
) -> ResponseResult<()> {
    let joined = !update.old_chat_member.kind.is_present() && update.new_chat_member.kind.is_present();
    if !joined || update.chat.is_private() {
        return respond(());
    }

    let chat_id = update.chat.id.0;
    info!(chat_id, "Bot added to chat");
    if let Err(e) = sink.register_subscriber(chat_id, chat_id).await {
        error!(chat_id, kind = e.kind(), error = %e, "Could not register chat");
        return respond(());
    }
    if let Err(e) = bot
        .send_message(update.chat.id, captions::WELCOME_GROUP)
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!(chat_id, error = %redact_sensitive_data(&e.to_string()), "Welcome message failed");
    }
    respond(())
}
