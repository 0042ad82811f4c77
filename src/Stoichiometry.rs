/// Module to calculate the molar mass of a chemical formula and its mass composition.
/// # Examples
/// ```
/// use StoichKit::Stoichiometry::molmass::calculate_molar_mass;
/// let (molar_mass, elements) = calculate_molar_mass("H2O").unwrap();
/// assert!((molar_mass - 18.015).abs() < 1e-3);
/// assert_eq!(elements.count("H"), 2);
/// ```
pub mod molmass;
/// eng
/// Conversion of a known amount of one compound of a reaction into the amount of another one:
/// grams or moles in, grams or moles out, through the ratio of the coefficients written in
/// the equation.
/// # Examples
/// ```
/// use StoichKit::Equations::equation_parser::parse_equation;
/// use StoichKit::Stoichiometry::conversion::{StoichiometryProblem, solve_stoichiometry};
/// let eq = parse_equation("2H2 + O2 -> 2H2O").unwrap();
/// let problem = StoichiometryProblem::parse("1 mol O2 -> ? mol H2O").unwrap();
/// let result = solve_stoichiometry(&eq, &problem).unwrap();
/// assert_eq!(result.target.value, 2.0);
/// ```
pub mod conversion;
/// eng
/// Finds the reactant that runs out first for given amounts of the reactants, the amounts of
/// products it allows and what remains of the other reactants.
pub mod limiting_reagent;
/// eng
/// Equilibrium constant of a reaction from the equilibrium concentrations of its species and
/// the position of the equilibrium it implies.
/// # Examples
/// ```
/// use StoichKit::Equations::equation_parser::parse_equation;
/// use StoichKit::Stoichiometry::equilibrium::{calculate_equilibrium_constant, parse_concentrations};
/// let eq = parse_equation("H2 + I2 <=> 2HI").unwrap();
/// let concentrations = parse_concentrations("[H2]=0.1 [I2]=0.1 [HI]=1.0").unwrap();
/// let report = calculate_equilibrium_constant(&eq, &concentrations).unwrap();
/// assert!((report.k - 100.0).abs() < 1e-9);
/// ```
pub mod equilibrium;
