//! Domain models for project cost estimation.
//!
//! # Core Concepts
//!
//! - [`TicketRecord`]: Immutable inputs of one job (crew sizes, labor hours, area,
//!   and up to eight quoted [`LineItem`]s).
//! - [`TicketInput`]: Raw, unvalidated ticket fields as entered by a user. Parsing
//!   turns it into a [`TicketRecord`] or an [`InputError`].
//! - [`ProjectSession`]: A session-scoped project, the client it is quoted for and
//!   the tickets added so far. Tickets are only ever appended; a reset clears them all.
//! - [`PredictionReport`]: The predicted cost together with every intermediate value
//!   that fed the model, for display.

mod prediction;
mod session;
mod ticket;

pub use prediction::*;
pub use session::*;
pub use ticket::*;
