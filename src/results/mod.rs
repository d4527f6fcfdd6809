pub mod poller;
pub mod view;

pub use poller::{FetchError, PollTiming, ReportSource, ResultsPoller};
pub use view::{RenderedReport, ResultAction, ResultsView};
