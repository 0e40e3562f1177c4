//! CPU-side compile and link of WGSL programs.
//!
//! Each stage is parsed on its own ("compile"), then both modules are
//! validated and their stage interface is matched location by location
//! ("link"). This surfaces every shader defect as a typed error before any
//! GPU object is created.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Module, ShaderStage as NagaStage, TypeInner};

use crate::errors::{PrismError, Result, ShaderStage};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// A resource binding declared by a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectedBinding {
    pub group: u32,
    pub binding: u32,
    pub name: String,
}

/// Bindings and vertex attributes discovered after linking.
#[derive(Debug, Clone, Default)]
pub struct ProgramReflection {
    /// Sorted by `(group, binding)`, deduplicated across stages.
    pub bindings: Vec<ReflectedBinding>,
    /// `(location, name)` of every vertex input, sorted by location.
    pub vertex_inputs: Vec<(u32, String)>,
}

impl ProgramReflection {
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<&ReflectedBinding> {
        self.bindings.iter().find(|b| b.name == name)
    }
}

/// Parses one stage.
pub fn compile_stage(stage: ShaderStage, source: &str) -> Result<Module> {
    naga::front::wgsl::parse_str(source).map_err(|e| PrismError::ShaderCompile {
        stage,
        log: e.emit_to_string(source),
    })
}

/// Validates both modules and matches the vertex outputs against the
/// fragment inputs.
pub fn link(
    vertex: (&Module, &str),
    fragment: (&Module, &str),
) -> Result<ProgramReflection> {
    validate(vertex.0, vertex.1)?;
    if !std::ptr::eq(vertex.0, fragment.0) {
        validate(fragment.0, fragment.1)?;
    }

    let vs_outputs = stage_interface(vertex.0, NagaStage::Vertex, VERTEX_ENTRY, Direction::Output)?;
    let fs_inputs = stage_interface(fragment.0, NagaStage::Fragment, FRAGMENT_ENTRY, Direction::Input)?;

    for (location, name, inner) in &fs_inputs {
        match vs_outputs.iter().find(|(l, _, _)| l == location) {
            None => {
                return Err(PrismError::ShaderLink {
                    log: format!(
                        "fragment input '{name}' at location {location} has no matching vertex output"
                    ),
                });
            }
            Some((_, vs_name, vs_inner)) if vs_inner != inner => {
                return Err(PrismError::ShaderLink {
                    log: format!(
                        "location {location}: vertex output '{vs_name}' is {vs_inner:?}, fragment input '{name}' is {inner:?}"
                    ),
                });
            }
            Some(_) => {}
        }
    }

    let mut bindings: Vec<ReflectedBinding> = resource_bindings(vertex.0)
        .chain(resource_bindings(fragment.0))
        .collect();
    bindings.sort_by_key(|b| (b.group, b.binding));
    bindings.dedup_by_key(|b| (b.group, b.binding));

    let mut vertex_inputs: Vec<(u32, String)> =
        stage_interface(vertex.0, NagaStage::Vertex, VERTEX_ENTRY, Direction::Input)?
            .into_iter()
            .map(|(location, name, _)| (location, name))
            .collect();
    vertex_inputs.sort_by_key(|(location, _)| *location);

    Ok(ProgramReflection {
        bindings,
        vertex_inputs,
    })
}

/// Compiles and links a single module carrying both entry points.
pub fn compile_combined(source: &str) -> Result<(Module, ProgramReflection)> {
    let module = compile_stage(ShaderStage::Combined, source)?;
    let reflection = link((&module, source), (&module, source))?;
    Ok((module, reflection))
}

fn validate(module: &Module, source: &str) -> Result<()> {
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(module)
        .map(|_| ())
        .map_err(|e| PrismError::ShaderLink {
            log: e.emit_to_string(source),
        })
}

#[derive(Clone, Copy)]
enum Direction {
    Input,
    Output,
}

/// `(location, name, type)` for every located value crossing the entry
/// point's boundary in `direction`. Builtins are skipped.
fn stage_interface(
    module: &Module,
    stage: NagaStage,
    entry: &str,
    direction: Direction,
) -> Result<Vec<(u32, String, TypeInner)>> {
    let entry_point = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == entry)
        .ok_or_else(|| PrismError::ShaderLink {
            log: format!("missing {stage:?} entry point '{entry}'"),
        })?;

    let mut out = Vec::new();
    let mut visit = |name: Option<&String>, ty: naga::Handle<naga::Type>, binding: Option<&Binding>| {
        match binding {
            Some(Binding::Location { location, .. }) => out.push((
                *location,
                name.cloned().unwrap_or_default(),
                module.types[ty].inner.clone(),
            )),
            Some(Binding::BuiltIn(_)) => {}
            None => {
                if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                    for member in members {
                        if let Some(Binding::Location { location, .. }) = &member.binding {
                            out.push((
                                *location,
                                member.name.clone().unwrap_or_default(),
                                module.types[member.ty].inner.clone(),
                            ));
                        }
                    }
                }
            }
        }
    };

    match direction {
        Direction::Input => {
            for arg in &entry_point.function.arguments {
                visit(arg.name.as_ref(), arg.ty, arg.binding.as_ref());
            }
        }
        Direction::Output => {
            if let Some(result) = &entry_point.function.result {
                visit(None, result.ty, result.binding.as_ref());
            }
        }
    }
    Ok(out)
}

fn resource_bindings(module: &Module) -> impl Iterator<Item = ReflectedBinding> + '_ {
    module.global_variables.iter().filter_map(|(_, var)| {
        var.binding.as_ref().map(|rb| ReflectedBinding {
            group: rb.group,
            binding: rb.binding,
            name: var.name.clone().unwrap_or_default(),
        })
    })
}
