//! Client side of the Direct Line session protocol: token acquisition,
//! conversation lifecycle, and activity exchange.

mod activity;
mod client;
mod error;
mod token;

pub use activity::{
    Activity, ActivityAck, ActivitySet, Attachment, CardAction, ChannelAccount, Conversation,
    SuggestedActions, ADAPTIVE_CARD_CONTENT_TYPE,
};
pub use client::{DirectLineClient, PollPolicy};
pub use error::{AuthError, TransportError};
pub use token::{BotIdentity, TokenClient};
