//! Human-readable factory report.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::core::name::{ComponentType, Name};
use crate::resolver::Factory;

const RULE: &str = "---------------------------------------------------";

impl Factory {
    /// Describe machines, overrides, bills of materials, deactivated
    /// components and the warehouse content.
    ///
    /// Checking bills of materials may build activation flags, nothing else.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // writing to a String never fails
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{}", RULE)?;
        writeln!(out, "--   MACHINES IN FACTORY {}", self.id())?;
        writeln!(out, "{}", RULE)?;

        writeln!(out, "MACHINES BY PRIORITY:")?;
        for entry in &self.machines {
            writeln!(out, "  {:>6} {:?}", entry.machine.priority(), entry.machine)?;
        }

        writeln!(out, "MACHINES BY BUILDER:")?;
        let mut by_origin: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in &self.machines {
            let origin = entry
                .origin
                .map(|name| name.simple_name())
                .unwrap_or_else(|| "<registered>".to_string());
            by_origin
                .entry(origin)
                .or_default()
                .push(format!("{:?}", entry.machine));
        }
        for (origin, machines) in &by_origin {
            writeln!(out, "  {}:", origin)?;
            for machine in machines {
                writeln!(out, "    {}", machine)?;
            }
        }

        let mut names: Vec<Name> = self
            .machines
            .iter()
            .flat_map(|entry| entry.machine.names_buildable(&ComponentType::any()))
            .collect();
        names.sort();
        names.dedup();

        writeln!(out, "BUILD BY:")?;
        for name in &names {
            let builders: Vec<_> = self
                .machines
                .iter()
                .filter(|entry| entry.machine.can_build(name))
                .collect();
            if let Some(first) = builders.first() {
                writeln!(out, "  {} <- {:?}", name.simple_name(), first.machine)?;
            }
        }

        writeln!(out, "OVERRIDING:")?;
        for name in &names {
            let builders: Vec<_> = self
                .machines
                .iter()
                .filter(|entry| entry.machine.can_build(name))
                .collect();
            if let [winner, overridden @ ..] = builders.as_slice() {
                if overridden.is_empty() {
                    continue;
                }
                writeln!(out, "  {}", name.simple_name())?;
                writeln!(out, "    {:?}", winner.machine)?;
                for entry in overridden {
                    writeln!(out, "      OVERRIDES {:?}", entry.machine)?;
                }
            }
        }

        writeln!(out, "BOM:")?;
        let mut deactivated = Vec::new();
        for name in &names {
            if !self.is_active(name) {
                deactivated.push(*name);
                continue;
            }
            let Some(engine) = self.engines(name).into_iter().next() else {
                continue;
            };
            let bom = engine.bill_of_materials();
            if bom.is_empty() {
                continue;
            }
            writeln!(out, "  {}:", name.simple_name())?;
            for query in bom.queries() {
                writeln!(out, "    {}", query)?;
                let found = self.find_names(query);
                if found.is_empty() && query.is_mandatory() {
                    writeln!(out, "      ERROR: CAN'T BE SATISFIED")?;
                }
                for dep in found {
                    writeln!(out, "      -> {}", dep.simple_name())?;
                }
            }
        }

        writeln!(out, "DEACTIVATED:")?;
        for name in &deactivated {
            writeln!(out, "  {}", name.simple_name())?;
        }

        writeln!(out, "CUSTOMIZERS:")?;
        for customizer in &self.customizers {
            writeln!(out, "  {:?}", customizer)?;
        }

        writeln!(out, "WAREHOUSE {}:", self.warehouse.id())?;
        for name in self.warehouse.list_names() {
            match self.warehouse.stored_box(&name) {
                Some(stored) => writeln!(
                    out,
                    "  {} ({:?})",
                    name.simple_name(),
                    stored.build_time()
                )?,
                None => writeln!(out, "  {}", name.simple_name())?,
            }
        }
        writeln!(out, "{}", RULE)
    }
}
