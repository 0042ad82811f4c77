/// logger initialisation for the binary, the library itself only uses the `log` macros
pub mod logging;
