mod util;

pub mod activity;
pub mod job;
pub mod notes;
pub mod tags;
pub mod taxonomy;
pub mod validate;

pub use activity::{ActivitySource, ProcessedActivity, RawActivity};
pub use job::{JobCounters, JobSnapshot, JobStatus};
pub use notes::{EmbeddingRecord, NoteBlock, NoteBlockEdit, NotePage};
pub use tags::{ActivityTag, Tag, TagAssignment, TagContext};
pub use taxonomy::{Category, SynonymMap, Taxonomy};
pub use util::truncate;
