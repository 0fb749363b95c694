use super::{AttributeDef, AttributeType, Range};
use crate::{coerce, driver::Accessor, Result, Value};

/// An attribute of a class, ready for coercion.
///
/// Created unbound from the store's definition; [`bind`](Self::bind) then
/// selects the accessors, compiles the range and coerces the initial value.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    pub name: String,

    pub ty: AttributeType,

    pub multivalue: bool,

    pub not_null: bool,

    /// Range as written in the schema
    pub range_src: Option<String>,

    /// Initial value as written in the schema
    pub init_src: Option<String>,

    pub description: String,

    /// Accessor used to read the attribute from the store
    pub getter: Accessor,

    /// Accessor used to write the attribute to the store
    pub setter: Accessor,

    range: Range,

    init: Option<Value>,

    bound: bool,
}

impl AttributeSpec {
    pub fn from_def(def: &AttributeDef) -> Result<AttributeSpec> {
        let ty = AttributeType::from_tag(&def.ty)?;

        Ok(AttributeSpec {
            name: def.name.clone(),
            ty,
            multivalue: def.multivalue,
            not_null: def.not_null,
            range_src: def.range.clone(),
            init_src: def.init_value.clone(),
            description: def.description.clone(),
            getter: Accessor::getter(ty, def.multivalue),
            setter: Accessor::setter(ty, def.multivalue),
            range: Range::Unbounded,
            init: None,
            bound: false,
        })
    }

    /// Prepares the attribute for coercion. Binding an already bound
    /// attribute does nothing.
    ///
    /// An initial value that does not coerce is logged and dropped; the
    /// attribute then behaves as if it had none.
    pub fn bind(&mut self, class: &str) -> Result<()> {
        if self.bound {
            return Ok(());
        }

        self.getter = Accessor::getter(self.ty, self.multivalue);
        self.setter = Accessor::setter(self.ty, self.multivalue);
        self.range = Range::compile(self.ty, self.range_src.as_deref())?;
        self.init = self.init_src.as_deref().and_then(|src| {
            let raw = self.raw_init(src)?;
            // Class references are checked once types exist
            match coerce::coerce(self, class, raw, &|_: &str| true) {
                Ok(value) => Some(value),
                Err(error) => {
                    tracing::warn!(
                        class,
                        field = %self.name,
                        init_value = src,
                        %error,
                        "ignoring initial value"
                    );
                    None
                }
            }
        });
        self.bound = true;

        Ok(())
    }

    fn raw_init(&self, src: &str) -> Option<Value> {
        if self.multivalue {
            let items = src
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect();
            Some(Value::List(items))
        } else if src.is_empty() && !self.ty.is_string_like() {
            None
        } else {
            Some(Value::from(src))
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn range(&self) -> &Range {
        &self.range
    }

    /// The coerced initial value, if the schema declares a valid one.
    pub fn init(&self) -> Option<&Value> {
        self.init.as_ref()
    }

    pub fn cardinality(&self) -> &'static str {
        super::cardinality(self.multivalue, self.not_null)
    }
}
