// File Action Plan Model

use std::os::fd::RawFd;

/// One instruction applied in the child before the program image is replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAction {
    Close {
        fd: RawFd,
    },
    /// Open `path` write-only onto `fd`
    Open {
        fd: RawFd,
        path: String,
    },
}

/// Ordered file actions; later actions win over earlier ones on the same fd
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileActionPlan {
    actions: Vec<FileAction>,
}

impl FileActionPlan {
    pub(crate) fn from_actions(actions: Vec<FileAction>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &[FileAction] {
        &self.actions
    }

    /// Descriptors closed by the plan, in order
    pub fn closed_fds(&self) -> impl Iterator<Item = RawFd> + '_ {
        self.actions.iter().filter_map(|action| match action {
            FileAction::Close { fd } => Some(*fd),
            FileAction::Open { .. } => None,
        })
    }

    pub fn last(&self) -> Option<&FileAction> {
        self.actions.last()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
