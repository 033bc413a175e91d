use serde::{Deserialize, Serialize};

use crate::bytecode::Command;
use crate::bytecode::emitter::Emitter;

/// The bytecode compiled from one source file.
///
/// `name` is the file stem. The translator uses it to key the `static`
/// segment, so two modules never share statics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmModule {
    pub name: String,
    pub commands: Vec<Command>,
}

impl VmModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            commands: Vec::new(),
        }
    }

    /// Renders the module in the text protocol, one command per line.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for command in &self.commands {
            text.push_str(&command.to_string());
            text.push('\n');
        }
        text
    }

    /// Compact binary image of the module.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl Emitter for VmModule {
    fn emit(&mut self, command: Command) {
        self.commands.push(command);
    }
}
