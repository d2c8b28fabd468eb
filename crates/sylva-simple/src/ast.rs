//! AST node kinds of the language

use sylva_schema::{DescriptorRef, NodeKind, SchemaRegistry, TypeDefinition};

pub const PACKAGE: &str = "simple";

pub struct CompilationUnit;
impl NodeKind for CompilationUnit {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "CompilationUnit";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.children("statements", "simple.Statement")
    }
}

pub struct Statement;
impl NodeKind for Statement {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "Statement";
}

/// `set <variable> = <value>`
pub struct SetStatement;
impl NodeKind for SetStatement {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "SetStatement";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .extends::<Statement>()
            .attribute("variable", "string")
            .child("value", "simple.Expression")
    }
}

pub struct DisplayStatement;
impl NodeKind for DisplayStatement {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "DisplayStatement";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .extends::<Statement>()
            .child("value", "simple.Expression")
    }
}

/// `input <name> is <type>`
pub struct InputDeclaration;
impl NodeKind for InputDeclaration {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "InputDeclaration";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .extends::<Statement>()
            .attribute("name", "string")
            .attribute("type", "string")
    }
}

pub struct Expression;
impl NodeKind for Expression {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "Expression";
}

pub struct IntLiteral;
impl NodeKind for IntLiteral {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "IntLiteral";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.extends::<Expression>().attribute("value", "int")
    }
}

pub struct DecLiteral;
impl NodeKind for DecLiteral {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "DecLiteral";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.extends::<Expression>().attribute("value", "decimal")
    }
}

pub struct StringLiteral;
impl NodeKind for StringLiteral {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "StringLiteral";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition.extends::<Expression>().attribute("value", "string")
    }
}

pub struct SumExpression;
impl NodeKind for SumExpression {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "SumExpression";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .extends::<Expression>()
            .child("left", "simple.Expression")
            .child("right", "simple.Expression")
    }
}

/// Use of a variable; resolves to the statement declaring it
pub struct ValueReference;
impl NodeKind for ValueReference {
    const PACKAGE: &'static str = PACKAGE;
    const NAME: &'static str = "ValueReference";

    fn define(definition: TypeDefinition) -> TypeDefinition {
        definition
            .extends::<Expression>()
            .reference("variable", "simple.Statement")
    }
}

/// Register every kind of the language, returning their descriptors
///
/// # Errors
///
/// Fails when a kind conflicts with a type already in `registry`.
pub fn register_all(registry: &SchemaRegistry) -> sylva_schema::Result<Vec<DescriptorRef>> {
    Ok(vec![
        registry.descriptor_for::<CompilationUnit>()?,
        registry.descriptor_for::<Statement>()?,
        registry.descriptor_for::<SetStatement>()?,
        registry.descriptor_for::<DisplayStatement>()?,
        registry.descriptor_for::<InputDeclaration>()?,
        registry.descriptor_for::<Expression>()?,
        registry.descriptor_for::<IntLiteral>()?,
        registry.descriptor_for::<DecLiteral>()?,
        registry.descriptor_for::<StringLiteral>()?,
        registry.descriptor_for::<SumExpression>()?,
        registry.descriptor_for::<ValueReference>()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statements_share_a_supertype() {
        let registry = SchemaRegistry::new();
        let descriptors = register_all(&registry).unwrap();
        assert_eq!(descriptors.len(), 11);

        let set = registry.descriptor_for::<SetStatement>().unwrap();
        assert!(set.is_kind::<Statement>());
        assert_eq!(set.child_names(), vec!["value"]);
        assert!(!set.is_child("variable"));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let registry = SchemaRegistry::new();
        register_all(&registry).unwrap();
        let before = registry.len();
        register_all(&registry).unwrap();
        assert_eq!(registry.len(), before);
    }
}
