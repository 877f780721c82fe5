//! Binary runtime: context construction, command routing and terminal setup.

pub(crate) mod context;
pub(crate) mod dispatcher;
pub(crate) mod exit_handler;
pub(crate) mod terminal;
