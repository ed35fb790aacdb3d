//! Telegram side of the relay.
//!
//! - **Updates** (`update`) - lenient decoding of webhook deliveries into `InboundMessage`
//! - **Bot API** (`client`) - `sendMessage` / `sendPhoto` behind the `ChatClient` trait
//! - **Captions** (`caption`) - MarkdownV2 escaping and listing captions
//!
//! Set `LEADRELAY_TELEGRAM_BOT_TOKEN` and point the bot's webhook at `POST /webhook`.

pub mod caption;
pub mod client;
pub mod update;

pub use caption::{escape_markdown_v2, listing_caption};
pub use client::{ChatClient, TelegramBotClient};
pub use update::{decode_update, Update};
