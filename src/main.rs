fn main() {
  otp_provision_lib::run()
}
