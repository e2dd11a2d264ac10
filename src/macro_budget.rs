//! Per-macro daily budgets
//!
//! Macro targets are a share of the calorie base budget converted to grams. Unlike
//! calories there is no weekly credit: each day starts fresh.

use crate::budget::BudgetEngine;
use crate::error::ComputeError;
use crate::intake::IntakeAnalytics;
use crate::types::{MacroKind, MacroSummary};
use serde::{Deserialize, Serialize};

/// User-set share of calories per macro (0-100 each)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroPercentages {
    pub protein: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub fat: Option<f64>,
}

impl MacroPercentages {
    pub fn get(&self, kind: MacroKind) -> Option<f64> {
        match kind {
            MacroKind::Protein => self.protein,
            MacroKind::Carbohydrates => self.carbohydrates,
            MacroKind::Fat => self.fat,
        }
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        let mut total = 0.0;
        for kind in MacroKind::ALL {
            if let Some(percent) = self.get(kind) {
                if !(0.0..=100.0).contains(&percent) {
                    return Err(ComputeError::InvalidConfig(format!(
                        "{} percentage must be within 0-100, got {}",
                        kind.as_str(),
                        percent
                    )));
                }
                total += percent;
            }
        }
        if total > 100.0 + 1e-6 {
            return Err(ComputeError::InvalidConfig(format!(
                "macro percentages add up to {}",
                total
            )));
        }
        Ok(())
    }
}

/// Gram target for a share of `base_budget_kcal`
pub fn gram_target(base_budget_kcal: f64, percent: f64, kind: MacroKind) -> f64 {
    base_budget_kcal * percent / 100.0 / kind.kcal_per_gram()
}

/// Immutable macro budgets for one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct MacroBudgetEngine {
    budget: Option<BudgetEngine>,
    protein: IntakeAnalytics,
    carbohydrates: IntakeAnalytics,
    fat: IntakeAnalytics,
    percentages: Option<MacroPercentages>,
}

impl MacroBudgetEngine {
    pub fn new(
        budget: Option<BudgetEngine>,
        protein: IntakeAnalytics,
        carbohydrates: IntakeAnalytics,
        fat: IntakeAnalytics,
        percentages: Option<MacroPercentages>,
    ) -> Result<Self, ComputeError> {
        if let Some(p) = &percentages {
            p.validate()?;
        }
        Ok(Self {
            budget,
            protein,
            carbohydrates,
            fat,
            percentages,
        })
    }

    pub fn intake(&self, kind: MacroKind) -> &IntakeAnalytics {
        match kind {
            MacroKind::Protein => &self.protein,
            MacroKind::Carbohydrates => &self.carbohydrates,
            MacroKind::Fat => &self.fat,
        }
    }

    pub fn percent(&self, kind: MacroKind) -> Option<f64> {
        self.percentages.and_then(|p| p.get(kind))
    }

    /// Gram target, when both a calorie budget and a percentage are set
    pub fn budget(&self, kind: MacroKind) -> Option<f64> {
        let base = self.budget.as_ref()?.base_budget();
        let percent = self.percent(kind)?;
        Some(gram_target(base, percent, kind))
    }

    pub fn today_total(&self, kind: MacroKind) -> f64 {
        self.intake(kind).today_total()
    }

    pub fn remaining(&self, kind: MacroKind) -> Option<f64> {
        self.budget(kind).map(|b| b - self.today_total(kind))
    }

    pub fn summarize(&self) -> Vec<MacroSummary> {
        let base = self.budget.as_ref().map(|b| b.base_budget());
        MacroKind::ALL
            .iter()
            .map(|&kind| {
                let percent = self.percent(kind);
                let budget = match (base, percent) {
                    (Some(base), Some(percent)) => Some(gram_target(base, percent, kind)),
                    _ => None,
                };
                let today_total = self.today_total(kind);
                MacroSummary {
                    kind,
                    percent,
                    budget,
                    remaining: budget.map(|b| b - today_total),
                    today_total,
                }
            })
            .collect()
    }
}
