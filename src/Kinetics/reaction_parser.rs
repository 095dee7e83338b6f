/// Parsing of reaction equations like "2H2 + O2 => 2H2O" or "A + B <=> C".
///
/// Arrows: "<=>" marks a reversible reaction; "=>", "->" and "=" mark an irreversible one.
/// Every side is a "+"-separated list of terms, a term is an optional stoichiometric
/// coefficient (integer or decimal, optionally followed by "*") and a species name.
/// Species names must start with a letter, e.g. "2H2O" is 2 x H2O, "0.5*O2" is 0.5 x O2.
use super::evaluator_api::KineticsError;
use nalgebra::DVector;
use regex::Regex;
use std::sync::OnceLock;

const TERM_PATTERN: &str = r"^(\d+(?:\.\d*)?)?\s*\*?\s*([A-Za-z][A-Za-z0-9_()\-,']*)$";

/// compiled once, shared by every equation parsed in the process
static TERM_REGEX: OnceLock<Regex> = OnceLock::new();

fn term_regex(equation: &str) -> Result<&'static Regex, KineticsError> {
    if let Some(re) = TERM_REGEX.get() {
        return Ok(re);
    }
    let re = Regex::new(TERM_PATTERN).map_err(|e| parse_error(equation, &e.to_string()))?;
    Ok(TERM_REGEX.get_or_init(|| re))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReaction {
    pub equation: String,
    pub reactants: Vec<(String, f64)>,
    pub products: Vec<(String, f64)>,
    pub reversible: bool,
}

fn parse_error(equation: &str, reason: &str) -> KineticsError {
    KineticsError::ParseError {
        equation: equation.to_string(),
        reason: reason.to_string(),
    }
}

fn split_arrow(equation: &str) -> Result<(&str, &str, bool), KineticsError> {
    for (arrow, reversible) in [("<=>", true), ("=>", false), ("->", false), ("=", false)] {
        if let Some((left, right)) = equation.split_once(arrow) {
            if right.contains("=>") || right.contains("->") || right.contains('=') {
                return Err(parse_error(equation, "more than one arrow"));
            }
            return Ok((left, right, reversible));
        }
    }
    Err(parse_error(equation, "no arrow found"))
}

fn parse_side(
    equation: &str,
    side: &str,
    re: &Regex,
) -> Result<Vec<(String, f64)>, KineticsError> {
    let mut terms = Vec::new();
    for term in side.split('+') {
        let term = term.trim();
        if term.is_empty() {
            return Err(parse_error(equation, "empty term"));
        }
        let captures = re
            .captures(term)
            .ok_or_else(|| parse_error(equation, &format!("cannot parse term '{}'", term)))?;
        let coefficient = match captures.get(1) {
            Some(number) => number
                .as_str()
                .parse::<f64>()
                .map_err(|e| parse_error(equation, &e.to_string()))?,
            None => 1.0,
        };
        if !(coefficient > 0.0) {
            return Err(parse_error(
                equation,
                &format!("non-positive coefficient in '{}'", term),
            ));
        }
        let name = captures
            .get(2)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| parse_error(equation, &format!("no species in '{}'", term)))?;
        terms.push((name, coefficient));
    }
    Ok(terms)
}

pub fn parse_equation(equation: &str) -> Result<ParsedReaction, KineticsError> {
    let re = term_regex(equation)?;
    let (left, right, reversible) = split_arrow(equation)?;
    let reactants = parse_side(equation, left, re)?;
    let products = parse_side(equation, right, re)?;
    Ok(ParsedReaction {
        equation: equation.to_string(),
        reactants,
        products,
        reversible,
    })
}

impl ParsedReaction {
    pub fn substances(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for (name, _) in self.reactants.iter().chain(self.products.iter()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }

    fn side_vector(
        &self,
        side: &[(String, f64)],
        substances: &[String],
    ) -> Result<DVector<f64>, KineticsError> {
        let mut nu = DVector::zeros(substances.len());
        for (name, coefficient) in side {
            let i = substances
                .iter()
                .position(|s| s == name)
                .ok_or_else(|| KineticsError::UnknownSpecies(name.clone()))?;
            nu[i] += coefficient;
        }
        Ok(nu)
    }

    /// (ν', ν'') over the given species ordering
    pub fn stoichiometry(
        &self,
        substances: &[String],
    ) -> Result<(DVector<f64>, DVector<f64>), KineticsError> {
        let nu_reactants = self.side_vector(&self.reactants, substances)?;
        let nu_products = self.side_vector(&self.products, substances)?;
        Ok((nu_reactants, nu_products))
    }
}
