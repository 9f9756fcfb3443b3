//! Hub-side discovery of new lights.

use huesync_core::PollKind;

use crate::cli::{GlobalOpts, SearchArgs};
use crate::config::Resolved;
use crate::error::CliError;

use super::open;

pub async fn handle(resolved: &Resolved, args: SearchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let session = open(resolved, false)?;
    session.bridge.poll_now(PollKind::Lights).await?;

    if !session.bridge.start_search_for(&args.serials).await {
        return Err(CliError::ApiError {
            message: "the hub did not accept the search request".into(),
        });
    }

    if !global.quiet {
        if args.serials.is_empty() {
            eprintln!("Search started; new lights will appear within a minute");
        } else {
            eprintln!("Search started for {} serial number(s)", args.serials.len());
        }
    }
    Ok(())
}
