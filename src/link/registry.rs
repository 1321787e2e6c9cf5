//! Command and event handler tables.
//!
//! Two independent opcode-keyed tables: commands return a signed status
//! that the dispatcher sends back as the mandatory RSP, events return
//! nothing. Tables install wholesale before the channel is armed; an
//! opcode arriving without a registered handler is a fatal protocol
//! violation (it means the peer was built against a different opcode set),
//! so there is no default handler and no silent drop.

use heapless::FnvIndexMap;

use crate::error::{Error, Result};

/// Upper bound on registered opcodes per table.
pub const MAX_HANDLERS: usize = 32;

/// Command handler: payload in, signed status out. The payload slice is
/// only valid for the duration of the call; the channel reuses it.
pub type CommandHandler = Box<dyn Fn(&[u8]) -> i8 + Send + Sync>;

/// Event handler: payload in, nothing observable out.
pub type EventHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Opcode → command handler table.
pub struct CommandTable {
    map: FnvIndexMap<u16, CommandHandler, MAX_HANDLERS>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self {
            map: FnvIndexMap::new(),
        }
    }

    /// Register a handler. Re-registering an opcode replaces the previous
    /// entry (last writer wins).
    pub fn register(
        &mut self,
        opcode: u16,
        handler: impl Fn(&[u8]) -> i8 + Send + Sync + 'static,
    ) -> Result<()> {
        self.map
            .insert(opcode, Box::new(handler))
            .map_err(|_| Error::Config("command table full"))?;
        Ok(())
    }

    /// Builder-style registration for startup tables.
    pub fn with(
        mut self,
        opcode: u16,
        handler: impl Fn(&[u8]) -> i8 + Send + Sync + 'static,
    ) -> Result<Self> {
        self.register(opcode, handler)?;
        Ok(self)
    }

    pub fn get(&self, opcode: u16) -> Option<&CommandHandler> {
        self.map.get(&opcode)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Opcode → event handler table.
pub struct EventTable {
    map: FnvIndexMap<u16, EventHandler, MAX_HANDLERS>,
}

impl Default for EventTable {
    fn default() -> Self {
        Self::new()
    }
}

impl EventTable {
    pub fn new() -> Self {
        Self {
            map: FnvIndexMap::new(),
        }
    }

    pub fn register(
        &mut self,
        opcode: u16,
        handler: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Result<()> {
        self.map
            .insert(opcode, Box::new(handler))
            .map_err(|_| Error::Config("event table full"))?;
        Ok(())
    }

    pub fn with(
        mut self,
        opcode: u16,
        handler: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Result<Self> {
        self.register(opcode, handler)?;
        Ok(self)
    }

    pub fn get(&self, opcode: u16) -> Option<&EventHandler> {
        self.map.get(&opcode)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// The channel's two dispatch tables.
#[derive(Default)]
pub struct HandlerRegistry {
    commands: CommandTable,
    events: EventTable,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the command table wholesale.
    pub fn set_command_handlers(&mut self, table: CommandTable) {
        self.commands = table;
    }

    /// Replace the event table wholesale.
    pub fn set_event_handlers(&mut self, table: EventTable) {
        self.events = table;
    }

    pub fn command(&self, opcode: u16) -> Option<&CommandHandler> {
        self.commands.get(opcode)
    }

    pub fn event(&self, opcode: u16) -> Option<&EventHandler> {
        self.events.get(opcode)
    }
}
