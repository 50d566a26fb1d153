pub mod push_delivery;
