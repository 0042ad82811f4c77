use thiserror::Error;

/// side of a reaction equation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reactants,
    Products,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Reactants => "reactants",
            Side::Products => "products",
        }
    }
}

/// error types of formula parsing, equation parsing, balancing and the calculators built on top of them
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChemError {
    #[error("Malformed formula '{formula}' at position {position}: {reason}")]
    MalformedFormula {
        formula: String,
        position: usize,
        reason: String,
    },
    #[error("No reaction arrow found in '{equation}'. Use ->, <-> or <=>")]
    NoArrowFound { equation: String },
    #[error("No {} found in '{equation}'", .side.as_str())]
    EmptySide { side: Side, equation: String },
    #[error("Unknown element: {symbol}")]
    UnknownElement { symbol: String },
    #[error("Equation '{equation}' cannot be balanced (no free variables)")]
    Unbalanceable { equation: String },
    #[error("No solution for '{equation}': {reason}")]
    NoSolution { equation: String, reason: String },
    #[error("Could not find {formula} in the equation")]
    CompoundNotFound { formula: String },
    #[error("Cannot parse '{input}': {reason}")]
    InvalidProblem { input: String, reason: String },
}

impl ChemError {
    pub(crate) fn malformed(formula: &str, position: usize, reason: impl Into<String>) -> Self {
        ChemError::MalformedFormula {
            formula: formula.to_string(),
            position,
            reason: reason.into(),
        }
    }

    pub(crate) fn no_solution(equation: &str, reason: impl Into<String>) -> Self {
        ChemError::NoSolution {
            equation: equation.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_problem(input: &str, reason: impl Into<String>) -> Self {
        ChemError::InvalidProblem {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
