pub mod eusci;
