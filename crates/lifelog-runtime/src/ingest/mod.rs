pub mod calendar;
pub mod notes;

pub use calendar::{CalendarIngestOutcome, CalendarIngestService, CalendarProgress};
pub use notes::{NoteIngestOutcome, NoteIngestService, NoteProgress};
