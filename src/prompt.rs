#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    io::{BufRead, Write},
};

use anyhow::Error;
use hashlink::LinkedHashMap;

use crate::{
    ast::SymbolKind,
    conflict::Conflict,
    discovery::DiscoverySet,
    migrate::{ConflictDecision, MappingDecision, MappingSource},
    resolver::{PartialMapping, RenamePlan},
    suggest::suggest_template_path,
};

/// Asks the user for mapping decisions on `output`, reading answers from `input`.
/// An empty answer or end of input picks the default.
///
/// Path choices and renames are remembered, so a name renamed once is renamed the
/// same way in every later template.
pub struct InteractiveMapping<R, W> {
    input: R,
    output: W,
    paths: HashMap<String, Option<String>>,
    variables: LinkedHashMap<String, String>,
    blocks: LinkedHashMap<String, String>,
}

impl<R: BufRead, W: Write> InteractiveMapping<R, W> {
    pub fn new(input: R, output: W) -> InteractiveMapping<R, W> {
        InteractiveMapping {
            input,
            output,
            paths: HashMap::new(),
            variables: LinkedHashMap::new(),
            blocks: LinkedHashMap::new(),
        }
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn confirm(&mut self, question: &str, default: bool) -> Result<bool, Error> {
        let hint = match default {
            true => "Y/n",
            false => "y/N",
        };
        loop {
            write!(self.output, "{} [{}]: ", question, hint)?;
            self.output.flush()?;
            let Some(answer) = self.read_line()? else {
                return Ok(default);
            };
            match answer.to_lowercase().as_str() {
                "" => return Ok(default),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }

    /// Asks for a value, returning `default` on an empty answer.
    pub fn prompt(&mut self, question: &str, default: &str) -> Result<String, Error> {
        match default.is_empty() {
            true => write!(self.output, "{}: ", question)?,
            false => write!(self.output, "{} [{}]: ", question, default)?,
        }
        self.output.flush()?;

        match self.read_line()? {
            Some(answer) if !answer.is_empty() => Ok(answer),
            _ => Ok(default.to_string()),
        }
    }

    fn choose(&mut self, options: &[&str], default: usize) -> Result<usize, Error> {
        loop {
            writeln!(self.output, "Choose action:")?;
            for (index, option) in options.iter().enumerate() {
                writeln!(self.output, "  {}. {}", index + 1, option)?;
            }
            write!(self.output, "Choice [{}]: ", default)?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                return Ok(default);
            };
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(choice) if (1..=options.len()).contains(&choice) => return Ok(choice),
                _ => writeln!(self.output, "Please enter a number from 1 to {}.", options.len())?,
            }
        }
    }

    fn choose_path(&mut self, source_path: &str) -> Result<Option<String>, Error> {
        if let Some(choice) = self.paths.get(source_path) {
            return Ok(choice.clone());
        }

        let suggested = suggest_template_path(source_path);
        let options = [
            format!("Keep same path ({})", source_path),
            format!("Use suggested path ({})", suggested),
            "Enter custom path".to_string(),
            "Skip this template".to_string(),
        ];
        let options = options.iter().map(String::as_str).collect::<Vec<_>>();

        let choice = match self.choose(&options, 2)? {
            1 => Some(source_path.to_string()),
            2 => Some(suggested.clone()),
            3 => Some(self.prompt("Enter new path", &suggested)?),
            _ => None,
        };

        self.paths.insert(source_path.to_string(), choice.clone());
        Ok(choice)
    }

    fn ask_renames(&mut self, kind: SymbolKind, names: &[&str]) -> Result<(), Error> {
        if names.is_empty() {
            return Ok(());
        }

        writeln!(self.output, "Found {} {}s:", names.len(), kind)?;
        for name in names {
            writeln!(self.output, "  - {}", name)?;
        }

        let question = match kind {
            SymbolKind::Variable => "Would you like to rename any variables?",
            SymbolKind::Block => "Would you like to customize block mappings?",
        };
        if !self.confirm(question, false)? {
            return Ok(());
        }

        for name in names {
            self.ask_rename(kind, name)?;
        }
        Ok(())
    }

    fn ask_rename(&mut self, kind: SymbolKind, name: &str) -> Result<(), Error> {
        let current = self.remembered(kind).get(name).cloned().unwrap_or_else(|| name.to_string());
        let question = format!("Rename {} '{}' to", kind, name);
        let new_name = self.prompt(&question, &current)?;

        let remembered = self.remembered_mut(kind);
        match new_name == name {
            true => remembered.remove(name),
            false => remembered.insert(name.to_string(), new_name),
        };
        Ok(())
    }

    fn remembered(&self, kind: SymbolKind) -> &LinkedHashMap<String, String> {
        match kind {
            SymbolKind::Variable => &self.variables,
            SymbolKind::Block => &self.blocks,
        }
    }

    fn remembered_mut(&mut self, kind: SymbolKind) -> &mut LinkedHashMap<String, String> {
        match kind {
            SymbolKind::Variable => &mut self.variables,
            SymbolKind::Block => &mut self.blocks,
        }
    }

    /// Explicit entries for the remembered renames that apply to `names`.
    fn explicit_renames<'a>(
        &self,
        kind: SymbolKind,
        names: impl Iterator<Item = &'a str>,
    ) -> LinkedHashMap<String, String> {
        let remembered = self.remembered(kind);
        names
            .filter_map(|name| remembered.get(name).map(|new_name| (name.to_string(), new_name.clone())))
            .collect()
    }

    fn read_line(&mut self) -> Result<Option<String>, Error> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> MappingSource for InteractiveMapping<R, W> {
    fn mapping(&mut self, source_path: &str, discovery: &DiscoverySet) -> Result<MappingDecision, Error> {
        writeln!(self.output)?;
        writeln!(self.output, "Template: {}", source_path)?;
        if let Some(extends) = &discovery.extends {
            writeln!(self.output, "Currently extends: {}", extends)?;
        }

        let Some(target_path) = self.choose_path(source_path)? else {
            writeln!(self.output, "Skipping template: {}", source_path)?;
            return Ok(MappingDecision::Skip);
        };

        let variables = discovery.variable_names().collect::<Vec<_>>();
        self.ask_renames(SymbolKind::Variable, &variables)?;

        let blocks = discovery.block_names().collect::<Vec<_>>();
        self.ask_renames(SymbolKind::Block, &blocks)?;

        let mut partial = PartialMapping::new(&target_path);
        partial.variables = self.explicit_renames(SymbolKind::Variable, discovery.variable_names());
        partial.blocks = self.explicit_renames(SymbolKind::Block, discovery.block_names());
        Ok(MappingDecision::Map(partial))
    }

    fn resolve_conflicts(
        &mut self,
        source_path: &str,
        partial: &PartialMapping,
        plan: &RenamePlan,
        conflicts: &[Conflict],
    ) -> Result<ConflictDecision, Error> {
        writeln!(self.output)?;
        writeln!(self.output, "Conflicts in {}:", source_path)?;
        for conflict in conflicts {
            writeln!(self.output, "  - {}", conflict)?;
        }

        let options = ["Retry with different names", "Skip this template", "Apply anyway"];
        match self.choose(&options, 2)? {
            1 => {}
            2 => return Ok(ConflictDecision::Skip),
            _ => return Ok(ConflictDecision::Force),
        }

        let mut next = partial.clone();
        for conflict in conflicts {
            match conflict {
                Conflict::VariableCollision { old_names, .. } => {
                    for name in old_names {
                        self.retry_rename(&mut next, SymbolKind::Variable, name, plan.variable(name))?;
                    }
                }
                Conflict::BlockCollision { old_names, .. } => {
                    for name in old_names {
                        self.retry_rename(&mut next, SymbolKind::Block, name, plan.block(name))?;
                    }
                }
                Conflict::ReservedName {
                    kind,
                    old_name,
                    new_name,
                } => {
                    self.retry_rename(&mut next, *kind, old_name, new_name)?;
                }
                Conflict::KeywordArgument { old_name, new_name } => {
                    self.retry_rename(&mut next, SymbolKind::Variable, old_name, new_name)?;
                }
                Conflict::UnresolvedExtends { target } => {
                    let target = self.prompt("Extends target", target)?;
                    next.target_extends = Some(target);
                }
                Conflict::PathCollision { target_path } => {
                    let target_path = self.prompt("Enter new path", target_path)?;
                    self.paths.insert(source_path.to_string(), Some(target_path.clone()));
                    next.target_path = target_path;
                }
            }
        }
        Ok(ConflictDecision::Retry(next))
    }
}

impl<R: BufRead, W: Write> InteractiveMapping<R, W> {
    fn retry_rename(
        &mut self,
        partial: &mut PartialMapping,
        kind: SymbolKind,
        name: &str,
        current: &str,
    ) -> Result<(), Error> {
        let question = format!("New name for {} '{}'", kind, name);
        let new_name = self.prompt(&question, current)?;

        let explicit = match kind {
            SymbolKind::Variable => &mut partial.variables,
            SymbolKind::Block => &mut partial.blocks,
        };
        explicit.insert(name.to_string(), new_name.clone());

        let remembered = self.remembered_mut(kind);
        match new_name == name {
            true => remembered.remove(name),
            false => remembered.insert(name.to_string(), new_name),
        };
        Ok(())
    }
}
