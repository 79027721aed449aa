use crate::models::Architecture;

/// Architectures a machine can run, best first.
pub fn applicable_architectures(machine: Architecture) -> Vec<Architecture> {
    match machine {
        Architecture::X64 => vec![Architecture::X64, Architecture::Neutral, Architecture::X86],
        Architecture::Arm64 => vec![
            Architecture::Arm64,
            Architecture::Neutral,
            Architecture::X64,
            Architecture::X86,
            Architecture::Arm,
        ],
        Architecture::X86 => vec![Architecture::X86, Architecture::Neutral],
        Architecture::Arm => vec![Architecture::Arm, Architecture::Neutral],
        Architecture::Neutral | Architecture::Unknown => vec![Architecture::Neutral],
    }
}

/// Ordered list of acceptable architectures; earlier entries rank higher.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchitectureRanking {
    machine: Architecture,
    order: Vec<Architecture>,
}

impl ArchitectureRanking {
    pub fn for_machine(machine: Architecture) -> Self {
        Self {
            machine,
            order: applicable_architectures(machine),
        }
    }

    /// Builds the ranking from a caller-supplied allow list.
    ///
    /// Entries the machine cannot run are dropped. `Unknown` ends the list
    /// and appends the machine's remaining architectures in their usual
    /// order. An empty list yields the machine default.
    pub fn with_allowed(machine: Architecture, allowed: &[Architecture]) -> Self {
        if allowed.is_empty() {
            return Self::for_machine(machine);
        }

        let machine_order = applicable_architectures(machine);
        let mut order = Vec::new();
        let mut append_remaining = false;

        for architecture in allowed {
            if *architecture == Architecture::Unknown {
                append_remaining = true;
                break;
            }
            if machine_order.contains(architecture) && !order.contains(architecture) {
                order.push(*architecture);
            }
        }

        if append_remaining {
            for architecture in machine_order {
                if !order.contains(&architecture) {
                    order.push(architecture);
                }
            }
        }

        Self { machine, order }
    }

    pub fn machine(&self) -> Architecture {
        self.machine
    }

    /// `len - index` for listed architectures, `None` when inapplicable.
    pub fn rank(&self, architecture: Architecture) -> Option<usize> {
        self.order
            .iter()
            .position(|candidate| *candidate == architecture)
            .map(|index| self.order.len() - index)
    }

    pub fn order(&self) -> &[Architecture] {
        &self.order
    }
}
