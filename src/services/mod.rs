//! Service layer for the watcher application.
//!
//! This module contains the collaborators at the edges of the core:
//! - Residence scraping (`FacHabitatSource`)
//! - Email delivery (`SmtpNotifier`)

mod notify;
mod scrape;

pub use notify::{Notifier, SmtpNotifier, render_html_table};
pub use scrape::{FacHabitatSource, ResidenceSource};
