//! Dependency-respecting export order.

use std::collections::HashMap;

use crate::model::{PropertyDefinition, ReferenceKind, TypeCategory, TypeDefinition};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

/// Order `types` for export: enums, then structs with referenced structs first, then interfaces
/// with inherited interfaces first, then classes with super types first.
///
/// Within each group declaration order is kept wherever dependencies allow it.
pub(crate) fn export_order(types: Vec<TypeDefinition>) -> Vec<TypeDefinition> {
    let mut enums = Vec::new();
    let mut structs = Vec::new();
    let mut interfaces = Vec::new();
    let mut classes = Vec::new();
    for definition in types {
        match definition.category() {
            TypeCategory::Enums => enums.push(definition),
            TypeCategory::Structs => structs.push(definition),
            TypeCategory::Interfaces => interfaces.push(definition),
            TypeCategory::Classes => classes.push(definition),
        }
    }

    let mut ordered = enums;
    ordered.extend(topological(structs, struct_dependencies));
    ordered.extend(topological(interfaces, class_dependencies));
    ordered.extend(topological(classes, class_dependencies));
    ordered
}

fn struct_dependencies(definition: &TypeDefinition) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(structure) = definition.structure() {
        for property in &structure.properties {
            collect_structs(property, &mut names);
        }
    }
    names
}

fn collect_structs(property: &PropertyDefinition, names: &mut Vec<String>) {
    property.walk(&mut |node| {
        if let Some(reference) = &node.reference {
            if reference.kind == ReferenceKind::Struct {
                names.push(reference.full_name());
            }
        }
    });
}

fn class_dependencies(definition: &TypeDefinition) -> Vec<String> {
    let TypeDefinition::Class(class) = definition else {
        return Vec::new();
    };
    class
        .super_type
        .iter()
        .chain(class.interfaces.iter())
        .map(|reference| reference.full_name())
        .collect()
}

fn topological<F>(items: Vec<TypeDefinition>, dependencies: F) -> Vec<TypeDefinition>
where
    F: Fn(&TypeDefinition) -> Vec<String>,
{
    let index: HashMap<String, usize> = items
        .iter()
        .enumerate()
        .map(|(position, definition)| (definition.base().full_name(), position))
        .collect();
    let edges: Vec<Vec<usize>> = items
        .iter()
        .map(|definition| {
            dependencies(definition)
                .iter()
                .filter_map(|name| index.get(name).copied())
                .collect()
        })
        .collect();

    let mut marks = vec![Mark::Unvisited; items.len()];
    let mut order = Vec::with_capacity(items.len());
    for start in 0..items.len() {
        visit(start, &edges, &mut marks, &mut order);
    }

    let mut slots: Vec<Option<TypeDefinition>> = items.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect()
}

fn visit(node: usize, edges: &[Vec<usize>], marks: &mut [Mark], order: &mut Vec<usize>) {
    if marks[node] != Mark::Unvisited {
        return;
    }
    marks[node] = Mark::Visiting;
    for &dependency in &edges[node] {
        visit(dependency, edges, marks, order);
    }
    marks[node] = Mark::Done;
    order.push(node);
}
