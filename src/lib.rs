pub mod campaign;
pub mod cli;
pub mod command;
pub mod config;
pub mod executioner;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_support;
