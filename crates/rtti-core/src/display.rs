//! Type formatting for diagnostics.
//!
//! Renders descriptors in TypeScript-like syntax. Declarations (aliases,
//! interfaces, classes, enums) print by name and are never expanded, which
//! keeps recursive types finite; anonymous nesting is cut off at
//! [`MAX_FORMAT_DEPTH`].

use crate::format::{Descriptor, Lazy, Member, TypeData};
use rtti_common::limits::MAX_FORMAT_DEPTH;
use std::fmt::{self, Write};

#[derive(Default)]
pub struct TypeFormatter {
    depth: u32,
}

impl TypeFormatter {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Format a descriptor into a fresh string.
    pub fn format(desc: &Descriptor) -> String {
        let mut out = String::new();
        let _ = write!(out, "{desc}");
        out
    }

    pub fn write(&mut self, f: &mut fmt::Formatter<'_>, desc: &Descriptor) -> fmt::Result {
        if self.depth >= MAX_FORMAT_DEPTH {
            return f.write_str("...");
        }
        self.depth += 1;
        let result = self.write_data(f, desc);
        self.depth -= 1;
        result
    }

    fn write_lazy(&mut self, f: &mut fmt::Formatter<'_>, lazy: &Lazy) -> fmt::Result {
        match lazy.force() {
            Ok(desc) => self.write(f, &desc),
            Err(_) => f.write_str("<error>"),
        }
    }

    fn write_list(
        &mut self,
        f: &mut fmt::Formatter<'_>,
        items: &[Descriptor],
        separator: &str,
    ) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            self.write(f, item)?;
        }
        Ok(())
    }

    fn write_members(&mut self, f: &mut fmt::Formatter<'_>, members: &[Member]) -> fmt::Result {
        if members.is_empty() {
            return f.write_str("{}");
        }
        f.write_str("{ ")?;
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            f.write_str(&member.name)?;
            if member.is_optional() {
                f.write_char('?')?;
            }
            f.write_str(": ")?;
            self.write_lazy(f, &member.ty)?;
        }
        f.write_str(" }")
    }

    fn write_data(&mut self, f: &mut fmt::Formatter<'_>, desc: &Descriptor) -> fmt::Result {
        match desc.data() {
            TypeData::Intrinsic(class) => f.write_str(class.keyword()),
            TypeData::Void => f.write_str("void"),
            TypeData::Undefined => f.write_str("undefined"),
            TypeData::Null => f.write_str("null"),
            TypeData::Any => f.write_str("any"),
            TypeData::Unknown => f.write_str("unknown"),
            TypeData::Never => f.write_str("never"),
            TypeData::True => f.write_str("true"),
            TypeData::False => f.write_str("false"),
            TypeData::Literal(value) => write!(f, "{value}"),
            TypeData::This => f.write_str("this"),
            TypeData::Union(members) if members.is_empty() => f.write_str("never"),
            TypeData::Union(members) => self.write_list(f, members, " | "),
            TypeData::Intersection(members) if members.is_empty() => f.write_str("unknown"),
            TypeData::Intersection(members) => self.write_list(f, members, " & "),
            TypeData::Tuple(elements) => {
                f.write_char('[')?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if element.flags.is_rest() {
                        f.write_str("...")?;
                    }
                    if let Some(name) = &element.name {
                        write!(f, "{name}")?;
                        if element.flags.is_optional() {
                            f.write_char('?')?;
                        }
                        f.write_str(": ")?;
                    }
                    self.write_lazy(f, &element.ty)?;
                    if element.name.is_none() && element.flags.is_optional() {
                        f.write_char('?')?;
                    }
                }
                f.write_char(']')
            }
            TypeData::Array(element) => {
                self.write_lazy(f, element)?;
                f.write_str("[]")
            }
            TypeData::Object(members) => self.write_members(f, members),
            TypeData::Interface(iface) => f.write_str(iface.token.name()),
            TypeData::Class(class) => f.write_str(class.token().name()),
            TypeData::Alias(alias) => f.write_str(alias.name()),
            TypeData::Enum(e) => f.write_str(e.name()),
            TypeData::Generic(generic) if generic.args.is_empty() => {
                self.write_lazy(f, &generic.base)
            }
            TypeData::Generic(generic) => {
                self.write_lazy(f, &generic.base)?;
                f.write_char('<')?;
                self.write_list(f, &generic.args, ", ")?;
                f.write_char('>')
            }
            TypeData::Mapped(mapped) => {
                self.write_lazy(f, &mapped.source)?;
                f.write_char('<')?;
                self.write_list(f, &mapped.args, ", ")?;
                f.write_char('>')
            }
            TypeData::TypeVariable(var) => f.write_str(&var.name),
            TypeData::Function(func) => {
                f.write_char('(')?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    if param.flags.is_rest() {
                        f.write_str("...")?;
                    }
                    f.write_str(&param.name)?;
                    if param.is_optional() {
                        f.write_char('?')?;
                    }
                    f.write_str(": ")?;
                    self.write_lazy(f, &param.ty)?;
                }
                f.write_str(") => ")?;
                self.write_lazy(f, &func.returns)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;
    use crate::format::{AliasRef, TupleElement, TypeSlot};

    #[test]
    fn formats_composites() {
        let shape = Descriptor::object_shape(vec![
            Member::new("a", Descriptor::number(), Flags::empty()),
            Member::new("b", Descriptor::array(Descriptor::string()), Flags::OPTIONAL),
        ]);
        assert_eq!(TypeFormatter::format(&shape), "{ a: number; b?: string[] }");

        let union = Descriptor::union(vec![Descriptor::literal_str("x"), Descriptor::null()]);
        assert_eq!(TypeFormatter::format(&union), "\"x\" | null");

        let tuple = Descriptor::tuple(vec![
            TupleElement::new(Descriptor::number()),
            TupleElement::named("rest", Descriptor::array(Descriptor::string()), Flags::REST),
        ]);
        assert_eq!(TypeFormatter::format(&tuple), "[number, ...rest: string[]]");
    }

    #[test]
    fn declarations_print_by_name() {
        let slot = TypeSlot::new("Loop");
        let alias = Descriptor::alias(AliasRef::new("Loop", vec![], slot.lazy()));
        slot.set(alias.clone()).expect("slot is empty");
        let generic = Descriptor::generic(alias, [Descriptor::bigint()]);
        assert_eq!(TypeFormatter::format(&generic), "Loop<bigint>");
    }

    #[test]
    fn anonymous_recursion_is_cut_off() {
        let slot = TypeSlot::new("Nested");
        let nested = Descriptor::array(slot.lazy());
        slot.set(nested.clone()).expect("slot is empty");
        let text = TypeFormatter::format(&nested);
        assert!(text.starts_with("..."));
        assert!(text.ends_with("[][]"));
    }
}
