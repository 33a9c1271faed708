//! Telegram bot client - polling dispatcher for messages and callbacks.
#![allow(dead_code)]

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, User};
use teloxide::RequestError;

use crate::config::{load_settings, Settings};
use crate::core::{
    Choice, ForceRemove, InvokeStyle, Member, Reply, Roster, SelectRegistry, Track, TrackQueue,
};
use crate::error::Error;

use super::sinks::{DeferredSink, DirectSink, SELECT_PREFIX};

/// Callback-data prefix for deferred force-remove invocations.
const FORCE_REMOVE_PREFIX: &str = "fr";

/// How often abandoned prompts are swept from the registry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const HELP_TEXT: &str = r#"tinywax commands:

/help - Show this help
/queue <title> - Add a track to the queue
/list - Show the queue
/forceremove <member> - (DJ) Remove all tracks a member queued

Just chatting also works: anyone who speaks becomes resolvable by name."#;

/// Process-wide state shared by every handler invocation.
#[derive(Clone)]
pub struct JukeboxState {
    pub queue: TrackQueue,
    pub roster: Roster,
    pub registry: SelectRegistry,
    pub settings: Settings,
}

impl JukeboxState {
    pub fn new(settings: Settings) -> Self {
        Self {
            queue: TrackQueue::new(),
            roster: Roster::new(),
            registry: SelectRegistry::new(),
            settings,
        }
    }

    pub fn is_dj(&self, sender_id: i64) -> bool {
        self.settings.djs.contains(sender_id)
    }

    pub fn force_remove(&self) -> ForceRemove {
        ForceRemove::new(
            self.queue.clone(),
            self.roster.clone(),
            self.registry.clone(),
            Duration::from_secs(self.settings.jukebox.prompt_timeout_secs),
            self.settings.jukebox.max_choices,
        )
    }

    pub fn cancel_ack_delay(&self) -> Duration {
        Duration::from_secs(self.settings.jukebox.cancel_ack_secs)
    }
}

/// Run the telegram bot daemon using polling.
pub async fn run_telegram_daemon() -> Result<(), Error> {
    tracing::info!("Starting tinywax Telegram bot...");

    let settings = load_settings()?;

    let token = settings
        .channels
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;

    let bot = Bot::new(token);

    if let Err(e) = bot
        .set_my_commands(vec![
            teloxide::types::BotCommand::new("help", "Show help"),
            teloxide::types::BotCommand::new("queue", "Add a track to the queue"),
            teloxide::types::BotCommand::new("list", "Show the queue"),
            teloxide::types::BotCommand::new("forceremove", "Remove all tracks a member queued"),
        ])
        .await
    {
        tracing::warn!("Failed to set commands: {}", e);
    }

    tracing::info!("Telegram bot commands set");

    let state = JukeboxState::new(settings);

    // Background sweep keeps the prompt registry bounded even when a prompt
    // is abandoned without a waiter.
    let sweep_registry = state.registry.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let swept = sweep_registry.sweep_expired();
            if swept > 0 {
                tracing::debug!("Swept {} expired prompt(s)", swept);
            }
        }
    });

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn member_from_user(user: &User) -> Member {
    let member = Member::new(user.id.0 as i64, &user.full_name());
    match &user.username {
        Some(u) => member.with_username(u),
        None => member,
    }
}

/// Handle incoming messages.
async fn handle_message(bot: Bot, msg: Message, state: JukeboxState) -> Result<(), RequestError> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };

    // Anyone who speaks becomes resolvable later.
    let member = member_from_user(user);
    state.roster.register(member.clone());

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if !text.starts_with('/') {
        return Ok(());
    }

    let chat_id = msg.chat.id;
    let mut parts = text.split_whitespace();
    let cmd = parts.next().unwrap_or("");
    // Group chats append @botname to commands.
    let cmd = cmd.split('@').next().unwrap_or(cmd);
    let rest = parts.collect::<Vec<_>>().join(" ");

    match cmd {
        "/start" | "/help" => {
            bot.send_message(chat_id, HELP_TEXT).await?;
        }
        "/queue" => {
            cmd_queue(bot, chat_id, &member, &rest, &state).await?;
        }
        "/list" => {
            cmd_list(bot, chat_id, member.id, &state).await?;
        }
        "/forceremove" => {
            cmd_force_remove(bot, chat_id, member.id, &rest, &state).await?;
        }
        _ => {
            bot.send_message(chat_id, "Unknown command. Send /help for available commands.")
                .await?;
        }
    }

    Ok(())
}

/// Handle /queue <title>.
async fn cmd_queue(
    bot: Bot,
    chat_id: ChatId,
    member: &Member,
    title: &str,
    state: &JukeboxState,
) -> Result<(), RequestError> {
    let title = title.trim();
    if title.is_empty() {
        bot.send_message(chat_id, "Usage: /queue <title>").await?;
        return Ok(());
    }

    state.queue.push(Track::new(member.id, &member.name, title));
    bot.send_message(chat_id, format!("Queued: {}", title)).await?;
    Ok(())
}

/// Handle /list. DJs also get per-member remove buttons.
async fn cmd_list(
    bot: Bot,
    chat_id: ChatId,
    sender_id: i64,
    state: &JukeboxState,
) -> Result<(), RequestError> {
    let tracks = state.queue.snapshot();
    if tracks.is_empty() {
        bot.send_message(chat_id, "There is nothing in the queue!").await?;
        return Ok(());
    }

    let mut text = String::from("Queue:\n");
    for (i, track) in tracks.iter().enumerate() {
        text.push_str(&format!("{}. {} — {}\n", i + 1, track.title, track.owner_name));
    }

    let request = bot.send_message(chat_id, text);
    if state.is_dj(sender_id) {
        request.reply_markup(owner_keyboard(state)).await?;
    } else {
        request.await?;
    }
    Ok(())
}

/// One remove button per owner currently in the queue.
fn owner_keyboard(state: &JukeboxState) -> InlineKeyboardMarkup {
    let mut owners: Vec<(i64, usize)> = state.queue.owner_counts().into_iter().collect();
    owners.sort_by_key(|(id, _)| *id);

    let rows: Vec<Vec<InlineKeyboardButton>> = owners
        .into_iter()
        .map(|(owner_id, count)| {
            let label = state
                .roster
                .get(owner_id)
                .map(|m| m.name)
                .unwrap_or_else(|| owner_id.to_string());
            vec![InlineKeyboardButton::callback(
                format!("Remove {} ({})", label, count),
                format!("{}:{}", FORCE_REMOVE_PREFIX, owner_id),
            )]
        })
        .collect();

    InlineKeyboardMarkup::new(rows)
}

/// Handle /forceremove <member> (direct style).
async fn cmd_force_remove(
    bot: Bot,
    chat_id: ChatId,
    sender_id: i64,
    query: &str,
    state: &JukeboxState,
) -> Result<(), RequestError> {
    if !state.is_dj(sender_id) {
        bot.send_message(chat_id, "Only DJs can do that!").await?;
        return Ok(());
    }

    let sink = DirectSink::new(bot.clone(), chat_id, state.cancel_ack_delay());
    if let Err(e) = state
        .force_remove()
        .run(sender_id, query, InvokeStyle::Direct, &sink)
        .await
    {
        tracing::error!("forceremove failed: {}", e);
        let _ = bot.send_message(chat_id, Reply::internal().text).await;
    }
    Ok(())
}

/// Handle callback queries: disambiguation selections and deferred
/// force-remove invocations from the /list keyboard.
async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: JukeboxState,
) -> Result<(), RequestError> {
    state.roster.register(member_from_user(&q.from));
    let responder_id = q.from.id.0 as i64;

    let Some(data) = q.data.clone() else {
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    if let Some(rest) = data.strip_prefix(&format!("{}:", SELECT_PREFIX)) {
        handle_selection(rest, responder_id, &state);
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    }

    if let Some(owner) = data.strip_prefix(&format!("{}:", FORCE_REMOVE_PREFIX)) {
        if !state.is_dj(responder_id) {
            bot.answer_callback_query(q.id)
                .text("Only DJs can do that!")
                .await?;
            return Ok(());
        }

        let Some(message) = q.message.as_ref() else {
            bot.answer_callback_query(q.id).await?;
            return Ok(());
        };
        let chat_id = message.chat().id;
        let message_id = message.id();
        bot.answer_callback_query(q.id).await?;

        // The acknowledgment message is edited as the flow progresses; run
        // in a task so a pending prompt never blocks this handler.
        let owner = owner.to_string();
        let run_bot = bot.clone();
        let run_state = state.clone();
        tokio::spawn(async move {
            let sink = DeferredSink::new(
                run_bot.clone(),
                chat_id,
                message_id,
                run_state.cancel_ack_delay(),
            );
            if let Err(e) = run_state
                .force_remove()
                .run(responder_id, &owner, InvokeStyle::Deferred, &sink)
                .await
            {
                tracing::error!("deferred forceremove failed: {}", e);
                let _ = run_bot
                    .edit_message_text(chat_id, message_id, Reply::internal().text)
                    .await;
            }
        });
        return Ok(());
    }

    tracing::debug!("Unrecognized callback data: {}", data);
    bot.answer_callback_query(q.id).await?;
    Ok(())
}

/// Route a selection callback into the prompt registry.
///
/// Stale, foreign, or malformed responses are dropped silently: the prompt
/// may already be resolved, expired, or owned by someone else.
fn handle_selection(rest: &str, responder_id: i64, state: &JukeboxState) {
    let Some((correlation_id, choice)) = rest.rsplit_once(':') else {
        return;
    };

    let choice = if choice == "cancel" {
        Choice::Cancel
    } else {
        match choice.parse::<usize>() {
            Ok(i) => Choice::Index(i),
            Err(_) => return,
        }
    };

    state.registry.respond(correlation_id, responder_id, choice);
}
