use std::{
    collections::{BTreeMap, BTreeSet, VecDeque},
    fmt,
    str::FromStr,
};

use crate::{Error, Instance};

/// Decides whether a supplier may be injected into one dependency slot of a consumer.
///
/// `slot` indexes `consumer.dependencies`. Implementations are pure predicates and must always
/// answer.
pub trait TypeOracle: Send + Sync {
    fn is_assignable(&self, supplier: &Instance, consumer: &Instance, slot: usize) -> bool;
}

impl<F> TypeOracle for F
where
    F: Fn(&Instance, &Instance, usize) -> bool + Send + Sync,
{
    fn is_assignable(&self, supplier: &Instance, consumer: &Instance, slot: usize) -> bool {
        self(supplier, consumer, slot)
    }
}

/// A possibly generic type name such as `java.util.Map<java.lang.String,java.lang.Integer>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    pub name: String,
    pub parameters: Vec<TypeExpr>,
}

impl TypeExpr {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(name: impl Into<String>, parameters: Vec<TypeExpr>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn is_raw(&self) -> bool {
        self.parameters.is_empty()
    }
}

impl FromStr for TypeExpr {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input, pos: 0 };
        let expr = parser.expr()?;
        parser.skip_ws();
        if parser.pos != input.len() {
            return Err(parser.error("trailing input"));
        }
        Ok(expr)
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.parameters.is_empty() {
            return Ok(());
        }
        f.write_str("<")?;
        for (idx, parameter) in self.parameters.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{parameter}")?;
        }
        f.write_str(">")
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn expr(&mut self) -> Result<TypeExpr, Error> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '<' | '>' | ',') || c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
        if start == self.pos {
            return Err(self.error("expected a type name"));
        }
        let name = self.input[start..self.pos].to_string();

        self.skip_ws();
        let mut parameters = Vec::new();
        if self.peek() == Some('<') {
            self.pos += 1;
            loop {
                parameters.push(self.expr()?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => self.pos += 1,
                    Some('>') => {
                        self.pos += 1;
                        break;
                    }
                    _ => return Err(self.error("unclosed type parameter list")),
                }
            }
        }
        Ok(TypeExpr { name, parameters })
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek()
            && c.is_whitespace()
        {
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, message: &'static str) -> Error {
        Error::InvalidType {
            input: self.input.to_string(),
            message,
        }
    }
}

/// A [`TypeOracle`] driven by declared subtype relations.
///
/// A supplier is assignable when its type equals the requirement, or when the required name is
/// the supplier's name or one of its (transitive) supertypes and the requirement is either raw
/// or carries identical parameters. Unparseable types compare verbatim.
#[derive(Clone, Debug, Default)]
pub struct TypeTable {
    supertypes: BTreeMap<String, BTreeSet<String>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, subtype: impl Into<String>, supertype: impl Into<String>) {
        self.supertypes
            .entry(subtype.into())
            .or_default()
            .insert(supertype.into());
    }

    pub fn is_subtype(&self, subtype: &str, supertype: &str) -> bool {
        if subtype == supertype {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([subtype]);
        while let Some(current) = queue.pop_front() {
            let Some(parents) = self.supertypes.get(current) else {
                continue;
            };
            for parent in parents {
                if parent == supertype {
                    return true;
                }
                if seen.insert(parent.as_str()) {
                    queue.push_back(parent.as_str());
                }
            }
        }
        false
    }

    pub fn is_assignable_type(&self, supplier: &str, required: &str) -> bool {
        if supplier == required {
            return true;
        }
        let (Ok(supplier), Ok(required)) = (supplier.parse::<TypeExpr>(), required.parse::<TypeExpr>())
        else {
            return false;
        };
        if supplier == required {
            return true;
        }
        self.is_subtype(&supplier.name, &required.name)
            && (required.is_raw() || supplier.parameters == required.parameters)
    }
}

impl TypeOracle for TypeTable {
    fn is_assignable(&self, supplier: &Instance, consumer: &Instance, slot: usize) -> bool {
        let Some(edge) = consumer.dependencies.get(slot) else {
            return false;
        };
        self.is_assignable_type(&supplier.declared_type, &edge.required_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DependencyEdge;

    #[test]
    fn parses_nested_parameters() {
        let expr: TypeExpr = "java.util.Map< java.lang.String , java.util.List<java.lang.Integer> >"
            .parse()
            .unwrap();
        assert_eq!(
            expr,
            TypeExpr::with_parameters(
                "java.util.Map",
                vec![
                    TypeExpr::new("java.lang.String"),
                    TypeExpr::with_parameters(
                        "java.util.List",
                        vec![TypeExpr::new("java.lang.Integer")]
                    ),
                ]
            )
        );
        assert_eq!(
            expr.to_string(),
            "java.util.Map<java.lang.String,java.util.List<java.lang.Integer>>"
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!("".parse::<TypeExpr>().is_err());
        assert!("List<".parse::<TypeExpr>().is_err());
        assert!("List<String".parse::<TypeExpr>().is_err());
        assert!("List<String>>".parse::<TypeExpr>().is_err());
        assert!("Map<,String>".parse::<TypeExpr>().is_err());
    }

    #[test]
    fn subtypes_are_transitive() {
        let mut table = TypeTable::new();
        table.declare("java.lang.String", "java.lang.CharSequence");
        table.declare("java.lang.CharSequence", "java.lang.Object");

        assert!(table.is_assignable_type("java.lang.String", "java.lang.Object"));
        assert!(table.is_assignable_type("java.lang.String", "java.lang.CharSequence"));
        assert!(!table.is_assignable_type("java.lang.CharSequence", "java.lang.String"));
    }

    #[test]
    fn parameters_are_invariant_unless_raw() {
        let mut table = TypeTable::new();
        table.declare("java.util.ArrayList", "java.util.List");
        table.declare("java.lang.String", "java.lang.Object");

        assert!(table.is_assignable_type("java.util.ArrayList<java.lang.String>", "java.util.List"));
        assert!(table.is_assignable_type(
            "java.util.ArrayList<java.lang.String>",
            "java.util.List<java.lang.String>"
        ));
        assert!(!table.is_assignable_type(
            "java.util.ArrayList<java.lang.String>",
            "java.util.List<java.lang.Object>"
        ));
    }

    #[test]
    fn oracle_reads_requirement_from_slot() {
        let table = TypeTable::new();
        let supplier = Instance::builder()
            .name("s")
            .declared_type("T")
            .owner("a")
            .location("a.s")
            .build();
        let consumer = Instance::builder()
            .name("c")
            .declared_type("C")
            .owner("a")
            .location("a.c")
            .dependencies(vec![DependencyEdge::new("x", "U"), DependencyEdge::new("s", "T")])
            .build();

        assert!(!table.is_assignable(&supplier, &consumer, 0));
        assert!(table.is_assignable(&supplier, &consumer, 1));
        assert!(!table.is_assignable(&supplier, &consumer, 2));
    }
}
