/// error type shared by the parsers, the balancer and the stoichiometry calculators
pub mod errors;
/// eng
/// Recursive descent parser of a single chemical formula: element symbols with counts,
/// parenthesized groups with multipliers, hydrate dots (`·` or `*`), a leading coefficient,
/// an ionic charge suffix and a physical state suffix.
/// Produces an insertion ordered element map together with the coefficient, charge and state.
/// # Examples
/// ```
/// use StoichKit::Equations::formula_parser::parse_formula;
/// let hydrate = parse_formula("CuSO4·5H2O").unwrap();
/// assert_eq!(hydrate.elements.count("O"), 9);
/// assert_eq!(hydrate.elements.count("H"), 10);
/// let ion = parse_formula("Fe3+").unwrap();
/// assert_eq!(ion.charge, Some(3));
/// ```
pub mod formula_parser;
/// eng
/// Splits a reaction equation into reactants and products on the arrow (`->`, `<->`, `<=>`)
/// and parses every term with the formula parser.
/// # Examples
/// ```
/// use StoichKit::Equations::equation_parser::{ArrowType, parse_equation};
/// let eq = parse_equation("N2 + H2 <=> NH3").unwrap();
/// assert_eq!(eq.arrow_type, ArrowType::Double);
/// assert_eq!(eq.reactants.len(), 2);
/// assert_eq!(eq.products.len(), 1);
/// ```
pub mod equation_parser;
/// element by compound matrix of a parsed equation, products enter with negative sign
pub mod composition_matrix;
/// eng
/// Balancing of a reaction by the null space of its composition matrix: Gauss-Jordan
/// elimination with partial pivoting, the first free variable fixed to 1, signs normalized
/// and the rational solution converted to the smallest positive integers.
/// # Examples
/// ```
/// use StoichKit::Equations::balancer::Balancer;
/// use StoichKit::Equations::equation_parser::parse_equation;
/// let eq = parse_equation("C3H8 + O2 -> CO2 + H2O").unwrap();
/// let balanced = Balancer::new().balance_with_report(&eq).unwrap();
/// assert_eq!(balanced.coefficients.coefficients(), &[1, 5, 3, 4]);
/// assert_eq!(balanced.to_string(), "C3H8 + 5O2 -> 3CO2 + 4H2O");
/// ```
pub mod balancer;
