// File Action Plan - translates fd dispositions into child-side file actions

use super::constants::{ERROR_CHANNEL_FD, NULL_SINK_PATH};
use crate::domain::{Disposition, FdDispositions, FileAction, FileActionPlan};
use std::os::fd::RawFd;
use tracing::debug;

/// Build the ordered file-action plan
///
/// Only `Disposition::Close` entries are acted upon; references that do not
/// resolve to a non-negative descriptor are skipped. The error channel is
/// always redirected to the null sink as the final action, so it overrides a
/// caller-requested close of fd 2.
pub fn build(dispositions: &FdDispositions) -> FileActionPlan {
    let mut actions = Vec::with_capacity(dispositions.len() + 1);
    let mut closed: Vec<RawFd> = Vec::with_capacity(dispositions.len());

    for (fd_ref, disposition) in dispositions.iter() {
        if *disposition != Disposition::Close {
            debug!(fd_ref = ?fd_ref, disposition = ?disposition, "Ignoring non-close disposition");
            continue;
        }

        let Some(fd) = fd_ref.resolve() else {
            debug!(fd_ref = ?fd_ref, "Skipping unresolvable descriptor");
            continue;
        };

        if closed.contains(&fd) {
            continue;
        }
        closed.push(fd);
        actions.push(FileAction::Close { fd });
    }

    actions.push(null_sink_redirect());

    FileActionPlan::from_actions(actions)
}

fn null_sink_redirect() -> FileAction {
    FileAction::Open {
        fd: ERROR_CHANNEL_FD,
        path: NULL_SINK_PATH.to_string(),
    }
}
