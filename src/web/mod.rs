pub mod landing;
pub mod responses;
pub mod router;
pub mod state;
pub mod templates;
pub mod uploads;

pub use responses::{ApiError, ConversionResponse, json_error};
pub use state::AppState;
pub use templates::{escape_html, render_footer};
