#[allow(non_snake_case)]
pub mod Equations;
#[allow(non_snake_case)]
pub mod Stoichiometry;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
pub mod settings;

pub use Equations::balancer::{BalancedEquation, Balancer, balance, balance_equation};
pub use Equations::equation_parser::{ArrowType, ParsedEquation, parse_equation};
pub use Equations::errors::ChemError;
pub use Equations::formula_parser::{ElementCount, ParsedFormula, parse_formula};
