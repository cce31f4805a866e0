pub mod audit;
pub mod cancel_transfer_command;
pub mod dispatch_return_command;
pub mod dispatch_transfer_command;
pub mod dispose_rejected_item_command;
pub mod initiate_transfer_command;
pub mod receive_transfer_items_command;
pub mod return_rejected_item_command;

pub use cancel_transfer_command::CancelTransferCommand;
pub use dispatch_return_command::DispatchReturnCommand;
pub use dispatch_transfer_command::DispatchTransferCommand;
pub use dispose_rejected_item_command::DisposeRejectedItemCommand;
pub use initiate_transfer_command::InitiateTransferCommand;
pub use receive_transfer_items_command::ReceiveTransferItemsCommand;
pub use return_rejected_item_command::ReturnRejectedItemCommand;
