use crate::Equations::equation_parser::ParsedEquation;
use log::debug;
use nalgebra::DMatrix;
use prettytable::{Cell, Row, Table};

/// Element-by-compound matrix of a reaction.
/// Rows follow the first appearance of every element, columns are reactants then products.
/// Reactant counts are positive and product counts negative, so a balanced set of coefficients
/// `x` satisfies `matrix * x = 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionMatrix {
    pub matrix: DMatrix<f64>,
    pub elements: Vec<String>,
    pub compounds: Vec<String>,
}

impl CompositionMatrix {
    pub fn nrows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.matrix.ncols()
    }

    /// table with element rows and compound columns
    pub fn pretty_table(&self) -> Table {
        let mut table = Table::new();
        let mut header = vec![Cell::new("")];
        header.extend(self.compounds.iter().map(|c| Cell::new(c)));
        table.add_row(Row::new(header));
        for (i, element) in self.elements.iter().enumerate() {
            let mut cells = vec![Cell::new(element)];
            cells.extend((0..self.ncols()).map(|j| Cell::new(&format!("{}", self.matrix[(i, j)]))));
            table.add_row(Row::new(cells));
        }
        table
    }
}

/// union of element symbols of all compounds in first-seen order
pub fn element_order(equation: &ParsedEquation) -> Vec<String> {
    let mut elements: Vec<String> = Vec::new();
    for compound in equation.compounds() {
        for symbol in compound.elements.symbols() {
            if !elements.iter().any(|e| e == symbol) {
                elements.push(symbol.to_string());
            }
        }
    }
    elements
}

pub fn build_matrix(equation: &ParsedEquation) -> CompositionMatrix {
    let elements = element_order(equation);
    let num_rows = elements.len();
    let num_cols = equation.compound_count();
    let mut matrix = DMatrix::zeros(num_rows, num_cols);
    for (j, compound) in equation.compounds().enumerate() {
        let sign = if equation.is_reactant_column(j) { 1.0 } else { -1.0 };
        for (i, element) in elements.iter().enumerate() {
            matrix[(i, j)] = sign * compound.elements.count(element) as f64;
        }
    }
    debug!(
        "composition matrix of '{}': {} elements x {} compounds",
        equation.original, num_rows, num_cols
    );
    CompositionMatrix {
        matrix,
        elements,
        compounds: equation.compounds().map(|c| c.original.clone()).collect(),
    }
}
