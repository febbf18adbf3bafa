mod harness;

mod link_failure;
mod resource_mask;
mod signaling;
