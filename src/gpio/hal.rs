use core::convert::Infallible;

use embedded_hal::digital::{
    ErrorType, InputPin as InputPinHal, OutputPin as OutputPinHal,
    StatefulOutputPin as StatefulOutputPinHal,
};

use super::{InputPin, IoPin, Level, OutputPin, Pin};

impl ErrorType for Pin {
    type Error = Infallible;
}

impl InputPinHal for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::read(self) == Level::High)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(Pin::read(self) == Level::Low)
    }
}

impl ErrorType for InputPin {
    type Error = Infallible;
}

impl InputPinHal for InputPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(InputPin::is_high(self))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(InputPin::is_low(self))
    }
}

impl ErrorType for OutputPin {
    type Error = Infallible;
}

impl OutputPinHal for OutputPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_low(self);

        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        OutputPin::set_high(self);

        Ok(())
    }
}

impl StatefulOutputPinHal for OutputPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(OutputPin::is_set_high(self))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(OutputPin::is_set_low(self))
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        OutputPin::toggle(self);

        Ok(())
    }
}

impl ErrorType for IoPin {
    type Error = Infallible;
}

impl InputPinHal for IoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_high(self))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_low(self))
    }
}

impl OutputPinHal for IoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        IoPin::set_low(self);

        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        IoPin::set_high(self);

        Ok(())
    }
}

impl StatefulOutputPinHal for IoPin {
    // Reads back the requested output level, so an open-drain pin that's
    // released while the line is held low externally still reports high.
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_set_high(self))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(IoPin::is_set_low(self))
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        IoPin::toggle(self);

        Ok(())
    }
}
