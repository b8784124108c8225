fn main() -> anyhow::Result<()> {
    env_logger::init();
    rucc_drv::main_impl(std::env::args().skip(1))
}
