pub(crate) mod audio;
pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
