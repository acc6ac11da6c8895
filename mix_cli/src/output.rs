//! Terminal rendering for calculator results and stored records.

use mix_core::calculations::{FixedFormulaResult, MaterialDistribution, MixTotals, ScaledMix};
use mix_core::config::AbaMaterialConfig;
use mix_core::formula::AbaFormula;
use mix_core::persistence::LoadedConfig;
use mix_core::store::RawMaterial;

const RULE: &str = "═══════════════════════════════════════════════════════════════════════";

pub fn banner(title: &str) {
    println!("{}", RULE);
    println!("  {}", title);
    println!("{}", RULE);
}

pub fn print_mix(rows: &[MaterialDistribution], totals: &MixTotals) {
    println!(
        "{:<18} {:>10} {:>10} {:>10} {:>8} {:>8}",
        "Material", "A kg", "B kg", "A+B kg", "A%", "B%"
    );
    for row in rows {
        println!(
            "{:<18} {:>10.2} {:>10.2} {:>10.2} {:>7.2}% {:>7.2}%",
            row.material, row.a_kg, row.b_kg, row.total_kg, row.a_percentage, row.b_percentage
        );
    }
    println!(
        "{:<18} {:>10.2} {:>10.2} {:>10.2}",
        "Total", totals.total_a_kg, totals.total_b_kg, totals.total_kg
    );
    println!();
    println!(
        "Screw split: A {:.2}% / B {:.2}%",
        totals.a_percentage, totals.b_percentage
    );
}

pub fn print_scaled(mix: &ScaledMix) {
    println!(
        "Target {:.2} kg from base {:.2} kg (factor {:.4})",
        mix.target_quantity_kg, mix.base_quantity_kg, mix.scale_factor
    );
    println!();
    // Same column order as the print view
    println!(
        "{:>10} {:<18} {:>10} {:>10} {:>8} {:>8} {:>8}",
        "A", "Material", "B", "A+B kg", "A+B%", "A%", "B%"
    );
    for row in &mix.rows {
        println!(
            "{:>10.2} {:<18} {:>10.2} {:>10.2} {:>7.1}% {:>7.1}% {:>7.1}%",
            row.scaled_a_kg,
            row.material,
            row.scaled_b_kg,
            row.scaled_total_kg,
            row.total_percentage,
            row.a_percentage,
            row.b_percentage
        );
    }
    println!(
        "{:>10.2} {:<18} {:>10.2} {:>10.2}",
        mix.total_a_kg,
        "Total",
        mix.total_b_kg,
        mix.total_a_kg + mix.total_b_kg
    );
    println!();
    println!("Screw split: A {:.2}% / B {:.2}%", mix.a_percentage, mix.b_percentage);
}

pub fn print_fixed(result: &FixedFormulaResult) {
    println!(
        "Recipe: {:?} for {:.0} kg",
        result.kind, result.quantity_kg
    );
    println!();
    print_mix(&result.rows, &result.totals);
}

pub fn print_loaded(config: &LoadedConfig, totals: &MixTotals) {
    println!(
        "#{} {}{}",
        config.id,
        config.name,
        if config.is_default { " [default]" } else { "" }
    );
    if let Some(description) = &config.description {
        println!("{}", description);
    }
    if config.legacy {
        println!("(legacy format: formula parameters taken from settings)");
    }
    println!(
        "Reference weights: A {:.2} kg / B {:.2} kg",
        config.formula_parameters.a_total_weight, config.formula_parameters.b_total_weight
    );
    println!();
    print_mix(&config.materials, totals);
}

pub fn print_configs(configs: &[AbaMaterialConfig]) {
    if configs.is_empty() {
        println!("No ABA material configs.");
        return;
    }
    for config in configs {
        println!(
            "{:>5}  {:<32} {}{}",
            config.id,
            config.name,
            config
                .created_at
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            if config.is_default { "  [default]" } else { "" }
        );
    }
}

pub fn print_formulas(formulas: &[AbaFormula]) {
    if formulas.is_empty() {
        println!("No ABA formulas.");
        return;
    }
    for formula in formulas {
        let id = formula.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string());
        println!("{:>5}  {:<32} A:B = {:.4}", id, formula.name, formula.a_to_b);
        for m in &formula.materials {
            println!(
                "         {:<24} A {:>6.2}%  B {:>6.2}%",
                m.material, m.screw_a_percentage, m.screw_b_percentage
            );
        }
    }
}

pub fn print_raw_materials(materials: &[RawMaterial]) {
    if materials.is_empty() {
        println!("No raw materials.");
        return;
    }
    for m in materials {
        println!("{:>5}  {:<32} {}", m.id, m.name, m.code.as_deref().unwrap_or(""));
    }
}
