/// interactive terminal menu and the reports it prints
pub mod cli_main;
