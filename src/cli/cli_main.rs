use crate::Equations::balancer::Balancer;
use crate::Equations::composition_matrix::build_matrix;
use crate::Equations::equation_parser::{ParsedEquation, parse_equation_with};
use crate::Equations::errors::ChemError;
use crate::Equations::formula_parser::{ParsedFormula, parse_formula_with};
use crate::Stoichiometry::conversion::{StoichiometryProblem, solve_stoichiometry};
use crate::Stoichiometry::equilibrium::{
    calculate_equilibrium_constant, format_constant, parse_concentrations,
};
use crate::Stoichiometry::limiting_reagent::{analyze_limiting_reagent, parse_amounts};
use crate::Stoichiometry::molmass::percent_composition;
use crate::settings::Settings;
use prettytable::{Table, row};
use std::fmt::Write as _;
use std::io::{self, Write};

pub fn run_interactive_menu(settings: &Settings) {
    loop {
        show_main_menu();
        let Some(choice) = get_user_input() else {
            break;
        };
        let report = match choice.trim() {
            "1" => ask("Equation (e.g. C3H8 + O2 -> CO2 + H2O)")
                .map(|equation| balance_report(&equation, settings)),
            "2" => ask("Formula (e.g. CuSO4·5H2O)").map(|formula| formula_report(&formula, settings)),
            "3" => ask("Formula (e.g. Ca(OH)2)").map(|formula| composition_report(&formula, settings)),
            "4" => ask("Equation (e.g. 2H2 + O2 -> 2H2O)").and_then(|equation| {
                ask("Problem (e.g. 5g H2 -> ? g H2O)")
                    .map(|problem| stoichiometry_report(&equation, &problem, settings))
            }),
            "5" => ask("Equation (e.g. 2H2 + O2 -> 2H2O)").and_then(|equation| {
                ask("Amounts (e.g. 5g H2, 10g O2)")
                    .map(|amounts| limiting_reagent_report(&equation, &amounts, settings))
            }),
            "6" => ask("Equation (e.g. N2 + 3H2 <-> 2NH3)").and_then(|equation| {
                ask("Concentrations (e.g. [N2]=0.5 [H2]=0.3 [NH3]=0.2)")
                    .map(|concentrations| equilibrium_report(&equation, &concentrations, settings))
            }),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => {
                println!("Invalid choice. Please try again.");
                continue;
            }
        };
        match report {
            Some(Ok(text)) => println!("{}", text),
            Some(Err(e)) => println!("\x1b[31mError: {}\x1b[0m", e),
            None => break,
        }
    }
}

/// balances every argument and prints the result, returns false when one of them failed
pub fn run_arguments(args: &[String], settings: &Settings) -> bool {
    let mut all_ok = true;
    for equation in args {
        match balance_report(equation, settings) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                all_ok = false;
            }
        }
    }
    all_ok
}
/* colors
Blue (\x1b[34m) - Welcome header text

Yellow (\x1b[33m) - Menu options

Cyan (\x1b[36m) - prompts

Red (\x1b[31m) - errors

Reset (\x1b[0m) - Returns to normal color after each colored section
*/
fn show_main_menu() {
    println!("\x1b[34m\n StoichKit: chemical formulas, equation balancing and stoichiometry \n\x1b[0m");
    println!("\x1b[33m1. Balance an equation\x1b[0m");
    println!("\x1b[33m2. Parse a formula\x1b[0m");
    println!("\x1b[33m3. Molar mass and composition\x1b[0m");
    println!("\x1b[33m4. Stoichiometry\x1b[0m");
    println!("\x1b[33m5. Limiting reagent\x1b[0m");
    println!("\x1b[33m6. Equilibrium constant\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
    print!("\x1b[36mEnter your choice: \x1b[0m");
    io::stdout().flush().ok();
}

fn ask(prompt: &str) -> Option<String> {
    print!("\x1b[36m{}: \x1b[0m", prompt);
    io::stdout().flush().ok();
    get_user_input()
}

/// None on end of input
fn get_user_input() -> Option<String> {
    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

fn parse_equation_for(text: &str, settings: &Settings) -> Result<ParsedEquation, ChemError> {
    parse_equation_with(text, &settings.parser_options())
}

pub fn balance_report(text: &str, settings: &Settings) -> Result<String, ChemError> {
    let equation = parse_equation_for(text, settings)?;
    let balanced = Balancer::with_options(settings.balancer_options()).balance_with_report(&equation)?;
    let mut report = String::new();
    writeln!(report, "Balanced: {}", balanced).ok();
    if settings.show_calculation_steps {
        let mut table = Table::new();
        table.add_row(row!["Compound", "Coefficient"]);
        for (compound, coefficient) in equation
            .compounds()
            .zip(balanced.coefficients.coefficients())
        {
            table.add_row(row![compound.formula_body(), coefficient]);
        }
        writeln!(report, "Composition matrix:\n{}", build_matrix(&equation).pretty_table()).ok();
        write!(report, "{}", table).ok();
    }
    Ok(report)
}

pub fn formula_report(text: &str, settings: &Settings) -> Result<String, ChemError> {
    let formula = parse_formula_with(text, &settings.parser_options())?;
    let mut table = Table::new();
    table.add_row(row!["Element", "Count"]);
    for (element, count) in formula.elements.iter() {
        table.add_row(row![element, count]);
    }
    let mut report = String::new();
    writeln!(report, "Formula: {}", formula.elements.to_formula_string()).ok();
    writeln!(report, "Coefficient: {}", formula.coefficient).ok();
    if let Some(charge) = formula.charge {
        writeln!(report, "Charge: {:+}", charge).ok();
        if has_bare_digit_charge(&formula) {
            writeln!(
                report,
                "Note: the digits before the sign were read as the charge, write e.g. NH4^+ for a subscript"
            )
            .ok();
        }
    }
    if let Some(state) = formula.state {
        writeln!(report, "State: {}", state.as_str()).ok();
    }
    write!(report, "{}", table).ok();
    Ok(report)
}

/// `NH4+`: a polyatomic ion whose charge digits follow a subscript position without '^'
fn has_bare_digit_charge(formula: &ParsedFormula) -> bool {
    let body = formula.formula_body().trim_end();
    let body = match formula.state {
        Some(state) => body
            .strip_suffix(&format!("({})", state.as_str()))
            .unwrap_or(body)
            .trim_end(),
        None => body,
    };
    formula.elements.len() > 1
        && !body.contains('^')
        && body
            .trim_end_matches(['+', '-'])
            .ends_with(|c: char| c.is_ascii_digit())
}

pub fn composition_report(text: &str, settings: &Settings) -> Result<String, ChemError> {
    let dp = settings.decimal_places;
    let formula = parse_formula_with(text, &settings.parser_options())?;
    let composition = percent_composition(&formula)?;
    let mut table = Table::new();
    table.add_row(row!["Element", "Count", "Mass (g/mol)", "Percent"]);
    for share in &composition.shares {
        table.add_row(row![
            share.element,
            share.count,
            format!("{:.dp$}", share.mass),
            format!("{:.dp$}%", share.percent)
        ]);
    }
    let mut report = String::new();
    writeln!(
        report,
        "{}: molar mass {:.dp$} g/mol",
        formula.original, composition.total_mass
    )
    .ok();
    write!(report, "{}", table).ok();
    writeln!(report, "Verification: sum = {:.dp$}%", composition.percent_sum()).ok();
    Ok(report)
}

pub fn stoichiometry_report(
    equation: &str,
    problem: &str,
    settings: &Settings,
) -> Result<String, ChemError> {
    let equation = parse_equation_for(equation, settings)?;
    let problem = StoichiometryProblem::parse(problem)?;
    let result = solve_stoichiometry(&equation, &problem)?;
    let mut report = String::new();
    if settings.show_calculation_steps {
        for step in result.steps(settings.decimal_places) {
            writeln!(report, "{}", step).ok();
        }
    }
    writeln!(report, "Answer: {}", result.answer(settings.decimal_places)).ok();
    Ok(report)
}

pub fn limiting_reagent_report(
    equation: &str,
    amounts: &str,
    settings: &Settings,
) -> Result<String, ChemError> {
    let dp = settings.decimal_places;
    let equation = parse_equation_for(equation, settings)?;
    let amounts = parse_amounts(amounts)?;
    let analysis = analyze_limiting_reagent(&equation, &amounts)?;

    let mut table = Table::new();
    table.add_row(row!["Reactant", "Given", "Moles", "/ Coefficient", "Ratio"]);
    for reactant in &analysis.reactants {
        table.add_row(row![
            reactant.formula,
            reactant.given,
            format!("{:.dp$}", reactant.moles),
            format!("/ {}", reactant.coefficient),
            format!("{:.dp$}", reactant.ratio)
        ]);
    }
    let mut report = String::new();
    write!(report, "{}", table).ok();
    writeln!(report, "Limiting reagent: {}", analysis.limiting().formula).ok();
    if settings.show_calculation_steps {
        writeln!(report, "Products formed:").ok();
        for product in &analysis.products {
            writeln!(
                report,
                "  {}: {:.dp$} mol = {:.dp$} g",
                product.formula, product.moles, product.grams
            )
            .ok();
        }
        writeln!(report, "Excess reagents remaining:").ok();
        for excess in &analysis.excess {
            writeln!(
                report,
                "  {}: {:.dp$} mol used, {:.dp$} mol remaining ({:.dp$} g)",
                excess.formula, excess.moles_used, excess.moles_remaining, excess.grams_remaining
            )
            .ok();
        }
    }
    Ok(report)
}

pub fn equilibrium_report(
    equation: &str,
    concentrations: &str,
    settings: &Settings,
) -> Result<String, ChemError> {
    let dp = settings.decimal_places;
    let equation = parse_equation_for(equation, settings)?;
    let concentrations = parse_concentrations(concentrations)?;
    let analysis = calculate_equilibrium_constant(&equation, &concentrations)?;
    let mut report = String::new();
    if !analysis.reversible {
        writeln!(report, "Note: the equation uses a one-way arrow").ok();
    }
    if settings.show_calculation_steps {
        writeln!(report, "{}", analysis.expression()).ok();
        writeln!(report, "{}", analysis.substitution()).ok();
        writeln!(
            report,
            "K = {:.dp$e} / {:.dp$e}",
            analysis.numerator, analysis.denominator
        )
        .ok();
    }
    writeln!(report, "K = {}", format_constant(analysis.k, dp)).ok();
    writeln!(report, "{}", analysis.position).ok();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_report() {
        let settings = Settings::default();
        let report = balance_report("H2 + O2 -> H2O", &settings).unwrap();
        assert!(report.starts_with("Balanced: 2H2 + O2 -> 2H2O"));
        assert!(report.contains("Coefficient"));

        let quiet = Settings {
            show_calculation_steps: false,
            ..Settings::default()
        };
        let report = balance_report("C3H8 + O2 -> CO2 + H2O", &quiet).unwrap();
        assert_eq!(report, "Balanced: C3H8 + 5O2 -> 3CO2 + 4H2O\n");

        assert!(matches!(
            balance_report("H2 -> O2", &settings),
            Err(ChemError::Unbalanceable { .. })
        ));
    }

    #[test]
    fn test_strict_settings_reach_the_parser() {
        let strict = Settings {
            strict_parsing: true,
            ..Settings::default()
        };
        assert!(formula_report("H2O!", &Settings::default()).is_ok());
        assert!(matches!(
            formula_report("H2O!", &strict),
            Err(ChemError::MalformedFormula { .. })
        ));
    }

    #[test]
    fn test_formula_report() {
        let report = formula_report("Fe3+", &Settings::default()).unwrap();
        assert!(report.contains("Formula: Fe\n"));
        assert!(report.contains("Charge: +3\n"));
    }

    #[test]
    fn test_formula_report_notes_bare_digit_charge() {
        let report = formula_report("NH4+", &Settings::default()).unwrap();
        assert!(report.contains("Charge: +4\n"));
        assert!(report.contains("Note: the digits before the sign"));

        for formula in ["NH4^+", "OH-", "Fe3+", "SO4^2-"] {
            let report = formula_report(formula, &Settings::default()).unwrap();
            assert!(!report.contains("Note:"), "{}", formula);
        }
    }

    #[test]
    fn test_composition_report() {
        let report = composition_report("H2O", &Settings::default()).unwrap();
        assert!(report.starts_with("H2O: molar mass 18.015 g/mol"));
        assert!(report.contains("Verification: sum = 100.000%"));
    }

    #[test]
    fn test_stoichiometry_report() {
        let report =
            stoichiometry_report("2H2 + O2 -> 2H2O", "1 mol O2 -> ? mol H2O", &Settings::default())
                .unwrap();
        assert!(report.ends_with("Answer: 2.000 mol H2O\n"));
    }

    #[test]
    fn test_limiting_reagent_report() {
        let report =
            limiting_reagent_report("2H2 + O2 -> 2H2O", "4g H2, 16g O2", &Settings::default())
                .unwrap();
        assert!(report.contains("Limiting reagent: O2"));
        assert!(report.contains("Excess reagents remaining:"));
    }

    #[test]
    fn test_equilibrium_report() {
        let report = equilibrium_report(
            "N2 + 3H2 <-> 2NH3",
            "[N2]=0.5 [H2]=0.3 [NH3]=0.2",
            &Settings::default(),
        )
        .unwrap();
        assert!(report.starts_with("K = [NH3]^2 / ([N2] × [H2]^3)\n"));
        assert!(report.contains("K = 2.963\n"));
        assert!(report.ends_with("Favors products\n"));

        let report =
            equilibrium_report("H2 + I2 -> 2HI", "[H2]=1 [I2]=1 [HI]=0.001", &Settings::default())
                .unwrap();
        assert!(report.starts_with("Note: the equation uses a one-way arrow\n"));
        assert!(report.contains("K = 1.000e-6\n"));
        assert!(report.ends_with("Strongly favors reactants\n"));

        assert!(matches!(
            equilibrium_report("N2 + 3H2 <-> 2NH3", "[N2]=0.5", &Settings::default()),
            Err(ChemError::CompoundNotFound { .. })
        ));
    }
}
