//! Record assemblers: turn one observed row into a typed record.
//!
//! Assemblers only read. Required sub-elements that are missing are a
//! `MalformedItem` error; optional ones come back as `None`.

pub mod chat;
pub mod post;
pub mod subscriber;

pub use chat::assemble_chat;
pub use post::{assemble_post, message_id_from, text_before_time};
pub use subscriber::{assemble_subscriber, enrich_profile, public_handle_url};
