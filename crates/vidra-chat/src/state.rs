//! Shared state handed to every chat connection.

use crate::messages::MessageService;
use crate::rooms::RoomService;

/// The use-case services one connection dispatches against.
pub struct ChatServices {
    pub rooms: RoomService,
    pub messages: MessageService,
}

impl ChatServices {
    pub fn new(rooms: RoomService, messages: MessageService) -> Self {
        Self { rooms, messages }
    }
}
