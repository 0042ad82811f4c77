use crate::Equations::equation_parser::ParsedEquation;
use crate::Equations::errors::ChemError;
use crate::Stoichiometry::conversion::{AmountUnit, Quantity, find_compound, parse_amount_value};
use crate::Stoichiometry::molmass::molar_mass;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\d.]+)\s*(?i:(g|mol))\s+(\S+)$").expect("amount pattern is valid")
});

/// given amount of one reactant, e.g. `5g H2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub quantity: Quantity,
    pub formula: String,
}

/// parses comma separated amounts `5g H2, 10g O2`, at least two are required
pub fn parse_amounts(input: &str) -> Result<Vec<Amount>, ChemError> {
    let mut amounts = Vec::new();
    for part in input.split(',').map(str::trim) {
        let caps = AMOUNT.captures(part).ok_or_else(|| {
            ChemError::invalid_problem(part, "expected an amount like '5g H2'")
        })?;
        let value = parse_amount_value(&caps[1], part)?;
        let unit = AmountUnit::from_symbol(&caps[2])
            .ok_or_else(|| ChemError::invalid_problem(part, "unknown unit"))?;
        amounts.push(Amount {
            quantity: Quantity { value, unit },
            formula: caps[3].to_string(),
        });
    }
    if amounts.len() < 2 {
        return Err(ChemError::invalid_problem(
            input,
            "provide at least 2 reactant amounts separated by commas",
        ));
    }
    Ok(amounts)
}

/// moles of a given reactant relative to its coefficient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactantAnalysis {
    pub formula: String,
    pub given: Quantity,
    pub molar_mass: f64,
    pub moles: f64,
    pub coefficient: u32,
    /// moles / coefficient
    pub ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductYield {
    pub formula: String,
    pub moles: f64,
    pub grams: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessReagent {
    pub formula: String,
    pub moles_used: f64,
    pub moles_remaining: f64,
    pub grams_remaining: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitingReagentReport {
    pub reactants: Vec<ReactantAnalysis>,
    /// index into `reactants`
    pub limiting_index: usize,
    pub products: Vec<ProductYield>,
    pub excess: Vec<ExcessReagent>,
}

impl LimitingReagentReport {
    pub fn limiting(&self) -> &ReactantAnalysis {
        &self.reactants[self.limiting_index]
    }
}

/// The reactant with the smallest moles/coefficient ratio limits the reaction, the first one
/// wins a tie. Product yields and the consumption of the other reactants follow from the
/// limiting moles and the coefficients written in the equation.
pub fn analyze_limiting_reagent(
    equation: &ParsedEquation,
    amounts: &[Amount],
) -> Result<LimitingReagentReport, ChemError> {
    if amounts.is_empty() {
        return Err(ChemError::invalid_problem(
            &equation.original,
            "no reactant amounts given",
        ));
    }
    let mut reactants = Vec::with_capacity(amounts.len());
    for amount in amounts {
        let compound = find_compound(&equation.reactants, &amount.formula)?;
        let molar_mass = molar_mass(&compound.elements)?;
        let moles = amount.quantity.to_moles(molar_mass);
        reactants.push(ReactantAnalysis {
            formula: amount.formula.clone(),
            given: amount.quantity,
            molar_mass,
            moles,
            coefficient: compound.coefficient,
            ratio: moles / compound.coefficient as f64,
        });
    }

    let mut limiting_index = 0;
    for (i, reactant) in reactants.iter().enumerate() {
        if reactant.ratio < reactants[limiting_index].ratio {
            limiting_index = i;
        }
    }
    let limiting = &reactants[limiting_index];
    debug!(
        "limiting reagent of '{}': {} with ratio {}",
        equation.original, limiting.formula, limiting.ratio
    );

    let mut products = Vec::with_capacity(equation.products.len());
    for product in &equation.products {
        let moles = limiting.moles * product.coefficient as f64 / limiting.coefficient as f64;
        products.push(ProductYield {
            formula: product.original.clone(),
            moles,
            grams: moles * molar_mass(&product.elements)?,
        });
    }

    let excess = reactants
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != limiting_index)
        .map(|(_, reactant)| {
            let moles_used =
                limiting.moles * reactant.coefficient as f64 / limiting.coefficient as f64;
            let moles_remaining = reactant.moles - moles_used;
            ExcessReagent {
                formula: reactant.formula.clone(),
                moles_used,
                moles_remaining,
                grams_remaining: moles_remaining * reactant.molar_mass,
            }
        })
        .collect();

    info!("limiting reagent: {}", limiting.formula);
    Ok(LimitingReagentReport {
        reactants,
        limiting_index,
        products,
        excess,
    })
}
