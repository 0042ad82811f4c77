//! # Balancer
//!
//! Finds the smallest positive integer coefficients of a reaction from the null space of its
//! composition matrix.
//!
//! ## Algorithm
//! 1. Gauss-Jordan elimination of the composition matrix to reduced row echelon form with
//!    partial pivoting. Entries below the tolerance are treated as structural zeros.
//! 2. Non-pivot columns are free variables. The first one is fixed to 1 and every pivot
//!    variable is read off its row: `x[pivot_col] = -rref[pivot_row][free_col]`.
//! 3. Signs: an all non-positive vector is negated, a vector with mixed signs takes absolute
//!    values of all entries.
//! 4. Entries are scaled by the precision scale, rounded, and divided by the gcd of the
//!    non-zero entries.
//!
//! ## Limitations
//! - Only the first free column is resolved. When the null space has more than one dimension
//!   the other free variables stay 0, and the result is rejected with
//!   [`ChemError::NoSolution`] because some compound would get a zero coefficient.
//! - Taking absolute values of a mixed-sign vector is a heuristic. The result is checked for
//!   element conservation and rejected with [`ChemError::NoSolution`] when the check fails.
use crate::Equations::composition_matrix::{build_matrix, element_order};
use crate::Equations::equation_parser::{ParsedEquation, parse_equation};
use crate::Equations::errors::ChemError;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const PIVOT_TOLERANCE: f64 = 1e-10;
pub const PRECISION_SCALE: f64 = 1_000_000.0;

/// numeric parameters of the balancer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalancerOptions {
    /// magnitudes below this value are zeros during elimination
    pub tolerance: f64,
    /// fractional coefficients are multiplied by this value before rounding
    pub precision_scale: f64,
}

impl Default for BalancerOptions {
    fn default() -> Self {
        Self {
            tolerance: PIVOT_TOLERANCE,
            precision_scale: PRECISION_SCALE,
        }
    }
}

/// Smallest positive integer coefficients, one per compound in reactants-then-products order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResult(Vec<u32>);

impl BalanceResult {
    pub fn coefficients(&self) -> &[u32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// an equation together with its balancing coefficients
#[derive(Debug, Clone, PartialEq)]
pub struct BalancedEquation {
    pub equation: ParsedEquation,
    pub coefficients: BalanceResult,
}

impl BalancedEquation {
    pub fn is_conserved(&self) -> bool {
        conserves_atoms(&self.equation, self.coefficients.coefficients())
    }

    /// copy of the equation whose compounds carry the balanced coefficients
    pub fn balanced_equation(&self) -> ParsedEquation {
        let mut equation = self.equation.clone();
        let coefficients = self.coefficients.coefficients();
        for (j, compound) in equation
            .reactants
            .iter_mut()
            .chain(equation.products.iter_mut())
            .enumerate()
        {
            if let Some(&coefficient) = coefficients.get(j) {
                compound.original = with_coefficient(coefficient, compound.formula_body());
                compound.coefficient = coefficient;
            }
        }
        equation.original = self.to_string();
        equation
    }
}

fn with_coefficient(coefficient: u32, formula: &str) -> String {
    if coefficient == 1 {
        formula.to_string()
    } else {
        format!("{}{}", coefficient, formula)
    }
}

impl fmt::Display for BalancedEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coefficients = self.coefficients.coefficients();
        let terms: Vec<String> = self
            .equation
            .compounds()
            .enumerate()
            .map(|(j, compound)| {
                with_coefficient(coefficients.get(j).copied().unwrap_or(1), compound.formula_body())
            })
            .collect();
        let (reactants, products) = terms.split_at(self.equation.reactants.len().min(terms.len()));
        write!(
            f,
            "{} {} {}",
            reactants.join(" + "),
            self.equation.arrow_type.as_str(),
            products.join(" + ")
        )
    }
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Gauss-Jordan elimination in place, returns the pivot columns in discovery order
pub fn reduced_row_echelon(matrix: &mut DMatrix<f64>, tolerance: f64) -> Vec<usize> {
    let (num_rows, num_cols) = matrix.shape();
    let mut pivot_row = 0;
    let mut pivot_cols = Vec::new();
    for col in 0..num_cols {
        if pivot_row >= num_rows {
            break;
        }
        // partial pivoting: the largest magnitude at or below the pivot row
        let max_row = pivot_row + matrix.column(col).rows_range(pivot_row..).iamax();
        if matrix[(max_row, col)].abs() < tolerance {
            continue;
        }
        matrix.swap_rows(pivot_row, max_row);
        let scale = matrix[(pivot_row, col)];
        matrix.row_mut(pivot_row).unscale_mut(scale);

        let pivot = matrix.row(pivot_row).clone_owned();
        for row in 0..num_rows {
            if row == pivot_row {
                continue;
            }
            let factor = matrix[(row, col)];
            if factor.abs() < tolerance {
                continue;
            }
            let reduced = matrix.row(row) - &pivot * factor;
            matrix.set_row(row, &reduced);
        }
        pivot_cols.push(col);
        pivot_row += 1;
    }
    pivot_cols
}

/// Null space solver for composition matrices
#[derive(Debug, Clone, Copy, Default)]
pub struct Balancer {
    pub options: BalancerOptions,
}

impl Balancer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BalancerOptions) -> Self {
        Self { options }
    }

    pub fn balance(&self, equation: &ParsedEquation) -> Result<BalanceResult, ChemError> {
        let name = equation.original.as_str();
        if equation.compound_count() == 0 {
            return Err(ChemError::no_solution(name, "equation has no compounds"));
        }
        let composition = build_matrix(equation);
        if composition.nrows() == 0 {
            return Err(ChemError::no_solution(name, "equation has no elements"));
        }
        let mut rref = composition.matrix.clone();
        let pivot_cols = reduced_row_echelon(&mut rref, self.options.tolerance);

        let free_cols: Vec<usize> = (0..composition.ncols())
            .filter(|col| !pivot_cols.contains(col))
            .collect();
        let Some(&free_col) = free_cols.first() else {
            return Err(ChemError::Unbalanceable {
                equation: name.to_string(),
            });
        };
        if free_cols.len() > 1 {
            warn!(
                "'{}' has {} free variables, only {} is resolved",
                name,
                free_cols.len(),
                composition.compounds[free_col]
            );
        }

        let mut solution = DVector::<f64>::zeros(composition.ncols());
        solution[free_col] = 1.0;
        for (row, &pivot_col) in pivot_cols.iter().enumerate() {
            solution[pivot_col] = -rref[(row, free_col)];
        }
        self.normalize_signs(&mut solution, name);
        if solution.iter().any(|c| !c.is_finite()) {
            return Err(ChemError::no_solution(name, "elimination produced a non-finite value"));
        }

        let mut coefficients = into_coefficients(self.scaled_integers(&solution), equation)?;
        if !conserves_atoms(equation, &coefficients) {
            // fractions like 1/3 do not survive scaling and rounding
            if let Some(exact) = self.rational_integers(&solution) {
                let exact = into_coefficients(exact, equation)?;
                if conserves_atoms(equation, &exact) {
                    debug!("'{}' recovered by rational approximation", name);
                    coefficients = exact;
                }
            }
        }
        if !conserves_atoms(equation, &coefficients) {
            warn!("coefficients {:?} do not conserve atoms in '{}'", coefficients, name);
            return Err(ChemError::no_solution(name, "coefficients do not conserve atoms"));
        }

        let result = BalanceResult(coefficients);
        info!(
            "balanced '{}': {}",
            name,
            BalancedEquation {
                equation: equation.clone(),
                coefficients: result.clone(),
            }
        );
        Ok(result)
    }

    pub fn balance_with_report(
        &self,
        equation: &ParsedEquation,
    ) -> Result<BalancedEquation, ChemError> {
        let coefficients = self.balance(equation)?;
        Ok(BalancedEquation {
            equation: equation.clone(),
            coefficients,
        })
    }

    fn normalize_signs(&self, solution: &mut DVector<f64>, name: &str) {
        let tolerance = self.options.tolerance;
        let has_negative = solution.iter().any(|&c| c < -tolerance);
        let has_positive = solution.iter().any(|&c| c > tolerance);
        if has_negative && has_positive {
            warn!("mixed signs in the solution of '{}', taking absolute values", name);
            solution.apply(|c| *c = c.abs());
        } else if has_negative {
            solution.neg_mut();
        }
    }

    /// scale, round, divide by the gcd of the non-zero entries
    fn scaled_integers(&self, solution: &DVector<f64>) -> Vec<u64> {
        let scaled: Vec<u64> = solution
            .iter()
            .map(|c| (c * self.options.precision_scale).round().abs() as u64)
            .collect();
        reduce_by_gcd(scaled)
    }

    /// continued fraction approximation of every entry with denominators up to the precision scale,
    /// brought to the least common denominator
    fn rational_integers(&self, solution: &DVector<f64>) -> Option<Vec<u64>> {
        let max_denominator = self.options.precision_scale.max(1.0) as u64;
        let fractions: Vec<(u64, u64)> = solution
            .iter()
            .map(|&c| to_fraction(c.abs(), max_denominator))
            .collect::<Option<_>>()?;
        let denominator = fractions
            .iter()
            .try_fold(1u64, |l, &(_, q)| (l / gcd(l, q)).checked_mul(q))?;
        let numerators = fractions
            .iter()
            .map(|&(p, q)| p.checked_mul(denominator / q))
            .collect::<Option<Vec<u64>>>()?;
        Some(reduce_by_gcd(numerators))
    }
}

fn reduce_by_gcd(values: Vec<u64>) -> Vec<u64> {
    let divisor = values
        .iter()
        .filter(|&&c| c != 0)
        .fold(0, |g, &c| gcd(g, c));
    let divisor = if divisor == 0 { 1 } else { divisor };
    values.into_iter().map(|c| c / divisor).collect()
}

/// best rational p/q with q <= max_denominator, None on overflow
fn to_fraction(x: f64, max_denominator: u64) -> Option<(u64, u64)> {
    let (mut p_prev, mut p) = (0u64, 1u64);
    let (mut q_prev, mut q) = (1u64, 0u64);
    let mut value = x;
    loop {
        let a = value.floor();
        if a > u32::MAX as f64 {
            return None;
        }
        let a = a as u64;
        let p_next = a.checked_mul(p)?.checked_add(p_prev)?;
        let q_next = a.checked_mul(q)?.checked_add(q_prev)?;
        if q_next > max_denominator {
            break;
        }
        (p_prev, p) = (p, p_next);
        (q_prev, q) = (q, q_next);
        let remainder = value - value.floor();
        if (x - p as f64 / q as f64).abs() <= 1e-12 * x.max(1.0) || remainder < 1e-12 {
            break;
        }
        value = 1.0 / remainder;
    }
    if q == 0 { None } else { Some((p, q)) }
}

/// positive u32 coefficients or the reason why there are none
fn into_coefficients(values: Vec<u64>, equation: &ParsedEquation) -> Result<Vec<u32>, ChemError> {
    let name = equation.original.as_str();
    equation
        .compounds()
        .zip(values)
        .map(|(compound, value)| {
            if value == 0 {
                return Err(ChemError::no_solution(
                    name,
                    format!("{} gets a zero coefficient", compound.original),
                ));
            }
            u32::try_from(value).map_err(|_| {
                ChemError::no_solution(
                    name,
                    format!("coefficient of {} is too large", compound.original),
                )
            })
        })
        .collect()
}

/// exact integer check: every element has the same number of atoms on both sides
pub fn conserves_atoms(equation: &ParsedEquation, coefficients: &[u32]) -> bool {
    if coefficients.len() != equation.compound_count() {
        return false;
    }
    element_order(equation).iter().all(|element| {
        let mut reactant_atoms: u128 = 0;
        let mut product_atoms: u128 = 0;
        for (j, compound) in equation.compounds().enumerate() {
            let atoms = coefficients[j] as u128 * compound.elements.count(element) as u128;
            if equation.is_reactant_column(j) {
                reactant_atoms += atoms;
            } else {
                product_atoms += atoms;
            }
        }
        reactant_atoms == product_atoms
    })
}

/// balances a parsed equation with the default options
pub fn balance(equation: &ParsedEquation) -> Result<BalanceResult, ChemError> {
    Balancer::new().balance(equation)
}

/// parses and balances an equation, coefficients follow `[...reactants, ...products]`
/// ```
/// use StoichKit::Equations::balancer::balance_equation;
/// assert_eq!(balance_equation("H2 + O2 -> H2O").unwrap(), vec![2, 1, 2]);
/// ```
pub fn balance_equation(text: &str) -> Result<Vec<u32>, ChemError> {
    let equation = parse_equation(text)?;
    Ok(balance(&equation)?.into_vec())
}
